pub mod config;
pub mod error;
pub mod feed;
pub mod geometry;
pub mod import;
pub mod logging;
mod postprocessor;
mod profile;
mod project;
pub mod ruled_surface;
mod toolpath_generation;
mod types;

pub use config::{ConfigLoad, ConfigStatus, HotwireConfig};
pub use error::HotwireError;
pub use feed::{feed_for_move, FeedMode, OffsetFunction};
pub use geometry::*;
pub use import::{check_file, load_primitives, CadPrimitive, FileCheck};
pub use logging::{guard, ErrorLog};
pub use postprocessor::{output_file_name, post_process_hotwire, remap_axes};
pub use profile::{MergeReport, Profile, SortReport};
pub use project::*;
pub use ruled_surface::{cut_speeds, make_offset_path, PlaneDistances, PlaneSpeeds, SpeedReference};
pub use toolpath_generation::*;
pub use types::*;
