pub type CinedriftResult<T> = Result<T, CinedriftError>;

#[derive(thiserror::Error, Debug)]
pub enum CinedriftError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CinedriftError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            CinedriftError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            CinedriftError::resource("x")
                .to_string()
                .contains("resource error:")
        );
        assert!(
            CinedriftError::render("x")
                .to_string()
                .contains("render error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = CinedriftError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
