pub mod io;
pub mod output_format;

pub use self::output_format::OutputFormat;
