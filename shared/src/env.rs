use dotenv::dotenv;

/// Loads variables from a `.env` file in the working directory, if any.
///
/// Variables already present in the process environment win.
pub fn init() {
    if let Ok(path) = dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }
}
