use thiserror::Error;

/// Command failures whose Display text is shown to the invoking user.
///
/// Internal failures are wrapped so the reply stays generic while the source
/// error goes to the log.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("You do not have the permission to use that command.")]
    MissingPermission,

    #[error("One or both of the language names provided are invalid.")]
    UnknownLanguage,

    #[error("The first and second language must be different.")]
    SameLanguage,

    #[error("That command can only be used in a server channel.")]
    GuildOnly,

    #[error("Something went wrong while handling the command.")]
    Internal(#[source] anyhow::Error),
}

impl From<anyhow::Error> for CommandError {
    fn from(e: anyhow::Error) -> Self {
        CommandError::Internal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_visible_messages() {
        assert_eq!(
            CommandError::MissingPermission.to_string(),
            "You do not have the permission to use that command."
        );
        assert_eq!(
            CommandError::UnknownLanguage.to_string(),
            "One or both of the language names provided are invalid."
        );
    }

    #[test]
    fn test_internal_display_is_generic() {
        let err = CommandError::Internal(anyhow::anyhow!("connection refused to 10.0.0.1"));
        // The underlying cause must not leak into the reply text
        assert!(!err.to_string().contains("10.0.0.1"));
    }

    #[test]
    fn test_from_anyhow() {
        let err: CommandError = anyhow::anyhow!("db down").into();
        assert!(matches!(err, CommandError::Internal(_)));
    }
}
