use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{exe} is not available: {reason}")]
    ToolUnavailable { exe: String, reason: String },

    #[error("{tool} exited with {code} (expected 0): {output}", code = display_code(.exit_code))]
    ExternalTool {
        tool: String,
        /// `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        output: String,
    },

    #[error("{tool} did not exit within {seconds}s and was terminated")]
    TimedOut { tool: String, seconds: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process error: {0}")]
    Process(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "a signal".to_string(),
    }
}
