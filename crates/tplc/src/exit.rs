use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitStatus {
    Success,
    Error,
}

/// How a command finished, and what to tell the user about it.
#[derive(Debug)]
pub struct Exit {
    status: ExitStatus,
    message: Option<String>,
}

impl Exit {
    pub fn success() -> Self {
        Self {
            status: ExitStatus::Success,
            message: None,
        }
    }

    pub fn error() -> Self {
        Self {
            status: ExitStatus::Error,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Print the message, if any, and turn the status into a process exit
    /// code. Errors go to stderr.
    pub fn report(self) -> ExitCode {
        match (self.status, self.message) {
            (ExitStatus::Success, Some(message)) => println!("{message}"),
            (ExitStatus::Error, Some(message)) => eprintln!("{message}"),
            (_, None) => {}
        }
        match self.status {
            ExitStatus::Success => ExitCode::SUCCESS,
            ExitStatus::Error => ExitCode::FAILURE,
        }
    }
}
