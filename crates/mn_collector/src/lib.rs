pub mod cli;
pub mod logging;
pub mod manager;
pub mod pagination;
pub mod search;

pub use cli::{handle_command, report_reclassify, CollectorCommands};
pub use logging::{init_logging, Logger};
pub use manager::{Collector, Reclassifier};
pub use pagination::{PageState, Paginator};
pub use search::{collect_bounded, NaverNewsClient, NewsSearch};
