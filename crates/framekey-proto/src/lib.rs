//! Wire types for keyframe analysis reports.
//!
//! Reports are written as a stream of length-delimited `AnalysisReport`
//! messages, one per analyzed input.

pub mod proto {
    /// Everything a single analysis run produced.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AnalysisReport {
        /// Path of the analyzed frame sequence.
        #[prost(string, tag = "1")]
        pub source: ::prost::alloc::string::String,
        /// Frames per second of the source, 0.0 if unknown.
        #[prost(double, tag = "2")]
        pub fps: f64,
        #[prost(uint32, tag = "3")]
        pub frame_count: u32,
        #[prost(message, optional, tag = "4")]
        pub weights: ::core::option::Option<Weights>,
        #[prost(message, optional, tag = "5")]
        pub statistics: ::core::option::Option<DifferenceStatistics>,
        #[prost(message, optional, tag = "6")]
        pub thresholds: ::core::option::Option<Thresholds>,
        /// Keyframe groups in increasing frame order.
        #[prost(message, repeated, tag = "7")]
        pub keyframes: ::prost::alloc::vec::Vec<KeyframeGroup>,
        /// One record per frame in increasing frame order.
        #[prost(message, repeated, tag = "8")]
        pub frames: ::prost::alloc::vec::Vec<FrameRecord>,
        #[prost(message, optional, tag = "9")]
        pub summary: ::core::option::Option<GroupSummary>,
        #[prost(string, tag = "10")]
        pub visualization: ::prost::alloc::string::String,
    }

    /// Configuration the run was performed with.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Weights {
        #[prost(double, tag = "1")]
        pub motion_weight: f64,
        #[prost(double, tag = "2")]
        pub color_weight: f64,
        #[prost(double, tag = "3")]
        pub motion_threshold: f64,
        #[prost(double, tag = "4")]
        pub color_threshold: f64,
        #[prost(uint32, tag = "5")]
        pub max_keyframe_group_size: u32,
    }

    /// Adjacent-pair difference statistics.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct DifferenceStatistics {
        #[prost(double, tag = "1")]
        pub min_motion_diff: f64,
        #[prost(double, tag = "2")]
        pub max_motion_diff: f64,
        #[prost(double, tag = "3")]
        pub average_motion_diff: f64,
        #[prost(double, tag = "4")]
        pub min_color_diff: f64,
        #[prost(double, tag = "5")]
        pub max_color_diff: f64,
        #[prost(double, tag = "6")]
        pub average_color_diff: f64,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Thresholds {
        #[prost(double, tag = "1")]
        pub motion_threshold: f64,
        #[prost(double, tag = "2")]
        pub color_threshold: f64,
        #[prost(double, tag = "3")]
        pub combined_threshold: f64,
    }

    /// A keyframe and the frames it represents.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct KeyframeGroup {
        #[prost(uint32, tag = "1")]
        pub keyframe_index: u32,
        #[prost(uint32, tag = "2")]
        pub frame_index: u32,
        /// Original indices of the child frames, ascending.
        #[prost(uint32, repeated, tag = "3")]
        pub children: ::prost::alloc::vec::Vec<u32>,
    }

    /// A pair of weighted difference scores.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Score {
        #[prost(double, tag = "1")]
        pub motion: f64,
        #[prost(double, tag = "2")]
        pub color: f64,
        #[prost(double, tag = "3")]
        pub combined: f64,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct FrameRecord {
        #[prost(uint32, tag = "1")]
        pub frame_index: u32,
        #[prost(bool, tag = "2")]
        pub is_keyframe: bool,
        /// Keyframe index of the frame itself, or of its owner for children.
        #[prost(uint32, tag = "3")]
        pub keyframe_index: u32,
        /// Score against the preceding frame. Absent for frame 0.
        #[prost(message, optional, tag = "4")]
        pub predecessor_score: ::core::option::Option<Score>,
        /// Score against the anchor keyframe. Absent for frame 0.
        #[prost(message, optional, tag = "5")]
        pub anchor_score: ::core::option::Option<Score>,
    }

    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct GroupSummary {
        #[prost(uint32, tag = "1")]
        pub keyframe_count: u32,
        #[prost(double, tag = "2")]
        pub keyframe_ratio: f64,
        #[prost(double, tag = "3")]
        pub average_group_size: f64,
        #[prost(uint32, tag = "4")]
        pub largest_group_size: u32,
        #[prost(uint32, tag = "5")]
        pub smallest_group_size: u32,
    }
}
