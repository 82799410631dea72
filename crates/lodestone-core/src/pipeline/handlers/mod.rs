mod convert;
mod error_handling;
mod execute;
mod log;
mod proxy;
mod resolve;
mod tracking;

pub use convert::ConvertHandler;
pub use error_handling::ErrorHandlingHandler;
pub use execute::ExecuteHandler;
pub use log::LogHandler;
pub use proxy::ProxyHandler;
pub use resolve::ResolveHandler;
pub use tracking::TrackingHandler;
