use std::fmt;

/// Request lifecycle of a record or a store.
///
/// Every request moves the status to [`Status::Loading`] when it starts and to
/// [`Status::Success`] or [`Status::Error`] when it settles. A settled status
/// can start loading again; nothing ever returns to [`Status::Initial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Initial,
    Loading,
    Error,
    Success,
}

impl Status {
    /// Status after a request has started.
    pub fn start(self) -> Self {
        Status::Loading
    }

    /// Status after a request has completed.
    pub fn succeed(self) -> Self {
        Status::Success
    }

    /// Status after a request has failed.
    pub fn fail(self) -> Self {
        Status::Error
    }

    /// Status after a request has settled with `result`.
    pub fn settle<T, E>(self, result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => self.succeed(),
            Err(_) => self.fail(),
        }
    }

    pub fn is_loading(self) -> bool {
        self == Status::Loading
    }

    pub fn is_error(self) -> bool {
        self == Status::Error
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Initial => "INITIAL",
            Status::Loading => "LOADING",
            Status::Error => "ERROR",
            Status::Success => "SUCCESS",
        };
        f.write_str(name)
    }
}
