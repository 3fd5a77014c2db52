use ev_core::EventError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> EventError {
    EventError::new(code, error.to_string())
}

pub(crate) fn json_string(raw: &str) -> String {
    serde_json::to_string(raw).unwrap_or_else(|_| format!("{:?}", raw))
}

pub(crate) fn emit_error(error: EventError) -> i32 {
    let message = match error.location {
        Some(location) => format!("{} ({})", error.message, location),
        None => error.message,
    };
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!("ERROR_MSG_JSON:{}", json_string(&message));
    1
}

pub(crate) fn map_cli_path(error: std::io::Error) -> EventError {
    map_error("CLI_PATH", error)
}

pub(crate) fn map_cli_scan(error: std::path::StripPrefixError) -> EventError {
    map_error("CLI_SCAN", error)
}

pub(crate) fn map_cli_program_read(error: std::io::Error) -> EventError {
    map_error("CLI_PROGRAM_READ", error)
}

pub(crate) fn map_cli_program_invalid(error: serde_json::Error) -> EventError {
    map_error("CLI_PROGRAM_INVALID", error)
}

pub(crate) fn map_cli_config_read(error: std::io::Error) -> EventError {
    map_error("CLI_CONFIG_READ", error)
}

pub(crate) fn map_cli_config_invalid(error: serde_json::Error) -> EventError {
    map_error("CLI_CONFIG_INVALID", error)
}

pub(crate) fn map_cli_state_write(error: std::io::Error) -> EventError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_encode(error: serde_json::Error) -> EventError {
    map_error("CLI_STATE_ENCODE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> EventError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> EventError {
    map_error("CLI_STATE_INVALID", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;
    use ev_core::{CommandLocation, ProgramId};

    fn invalid_json() -> serde_json::Error {
        serde_json::from_str::<u8>("nope").expect_err("invalid json")
    }

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        assert_eq!(emit_error(EventError::new("ERR", "failed")), 1);
        let located = EventError::at(
            "ENGINE_EVAL_ERROR",
            "boom",
            CommandLocation {
                program: ProgramId(4),
                index: 2,
            },
        );
        assert_eq!(emit_error(located), 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(map_cli_path(std::io::Error::other("path")).code, "CLI_PATH");
        let strip_error = std::path::Path::new("/a")
            .strip_prefix("/b")
            .expect_err("strip prefix");
        assert_eq!(map_cli_scan(strip_error).code, "CLI_SCAN");
        assert_eq!(
            map_cli_program_read(std::io::Error::other("read")).code,
            "CLI_PROGRAM_READ"
        );
        assert_eq!(
            map_cli_program_invalid(invalid_json()).code,
            "CLI_PROGRAM_INVALID"
        );
        assert_eq!(
            map_cli_config_read(std::io::Error::other("read")).code,
            "CLI_CONFIG_READ"
        );
        assert_eq!(
            map_cli_config_invalid(invalid_json()).code,
            "CLI_CONFIG_INVALID"
        );
        assert_eq!(
            map_cli_state_write(std::io::Error::other("write")).code,
            "CLI_STATE_WRITE"
        );
        assert_eq!(map_cli_state_encode(invalid_json()).code, "CLI_STATE_ENCODE");
        assert_eq!(
            map_cli_state_read(std::io::Error::other("read")).code,
            "CLI_STATE_READ"
        );
        assert_eq!(
            map_cli_state_invalid(invalid_json()).code,
            "CLI_STATE_INVALID"
        );
    }

    #[test]
    fn json_string_quotes_and_escapes() {
        assert_eq!(json_string("a \"b\"\n"), "\"a \\\"b\\\"\\n\"");
    }
}
