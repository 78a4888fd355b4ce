use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OracleResult<T> = Result<T, OracleError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    FormatError,
    ComputationError,
    InternalError,
}

impl OracleErrorCategory {
    pub const fn exit_disposition(self) -> ExitDisposition {
        match self {
            Self::Success => ExitDisposition {
                exit_code: 0,
                category_name: "Success",
                short_class: "SUCCESS",
            },
            Self::InputValidationError => ExitDisposition {
                exit_code: 2,
                category_name: "InputValidationError",
                short_class: "INPUT_FATAL",
            },
            Self::IoSystemError => ExitDisposition {
                exit_code: 3,
                category_name: "IoSystemError",
                short_class: "IO_FATAL",
            },
            Self::FormatError => ExitDisposition {
                exit_code: 4,
                category_name: "FormatError",
                short_class: "FORMAT_FATAL",
            },
            Self::ComputationError => ExitDisposition {
                exit_code: 5,
                category_name: "ComputationError",
                short_class: "RUN_FATAL",
            },
            Self::InternalError => ExitDisposition {
                exit_code: 6,
                category_name: "InternalError",
                short_class: "SYS_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_disposition().exit_code
    }

    pub const fn category_name(self) -> &'static str {
        self.exit_disposition().category_name
    }

    pub const fn short_class(self) -> &'static str {
        self.exit_disposition().short_class
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitDisposition {
    pub exit_code: i32,
    pub category_name: &'static str,
    pub short_class: &'static str,
}

/// Unrecoverable failure of an oracle run.
///
/// The `placeholder` is a stable dotted identifier (`IO.PTRAC_OPEN`,
/// `FORMAT.PTRAC_RECORD_LENGTH`, ...) that tests and scripts can match on
/// without parsing the free-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleError {
    category: OracleErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl OracleError {
    pub fn new(
        category: OracleErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            OracleErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OracleErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OracleErrorCategory::FormatError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OracleErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(OracleErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> OracleErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for OracleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.category_name(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for OracleError {}
