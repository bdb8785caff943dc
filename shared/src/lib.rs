pub mod canvas;
pub mod env;
pub mod logger;
pub mod models;
pub mod networking;
pub mod segmenter;
pub mod source;
