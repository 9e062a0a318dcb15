use crate::presets::{AspectRatio, SizePreset, StylePreset};

use super::registry::{find_command, ArgKind, CLEAR_WORDS};

/// One line of studio input, parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum StudioCommand {
    Noop,
    Generate { prompt: String },
    SetStyle(Option<StylePreset>),
    SetSize(SizePreset),
    SetAspect(Option<AspectRatio>),
    SetSeed(Option<u64>),
    SetGuidance(f64),
    SetSteps(u32),
    SetNegative(String),
    Regenerate,
    Retry,
    Gallery,
    /// Zero-based gallery position (users type 1-based).
    Show(usize),
    Save(Option<String>),
    NewPrompt,
    Idea(Option<usize>),
    Status,
    Help,
    Quit,
    Invalid { command: String, reason: String },
    Unknown { command: String, arg: String },
}

fn invalid(command: &str, reason: impl Into<String>) -> StudioCommand {
    StudioCommand::Invalid {
        command: command.to_string(),
        reason: reason.into(),
    }
}

fn parse_path_arg(arg: &str) -> Option<String> {
    if arg.trim().is_empty() {
        return None;
    }
    let parts = match shell_words::split(arg) {
        Ok(parts) => parts,
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    };
    let joined = parts
        .into_iter()
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn is_clear_word(arg: &str) -> bool {
    let lowered = arg.trim().to_ascii_lowercase();
    CLEAR_WORDS.iter().any(|word| *word == lowered)
}

fn parse_preset(command: &str, arg: &str) -> StudioCommand {
    if arg.is_empty() {
        return invalid(command, format!("/{command} needs a value"));
    }
    let parsed = match command {
        "style" if is_clear_word(arg) => Ok(StudioCommand::SetStyle(None)),
        "style" => arg.parse().map(|style| StudioCommand::SetStyle(Some(style))),
        "aspect" if is_clear_word(arg) => Ok(StudioCommand::SetAspect(None)),
        "aspect" => arg.parse().map(|aspect| StudioCommand::SetAspect(Some(aspect))),
        _ => arg.parse().map(StudioCommand::SetSize),
    };
    parsed.unwrap_or_else(|err| invalid(command, err.to_string()))
}

fn parse_number(command: &str, arg: &str) -> StudioCommand {
    match command {
        "seed" => {
            if arg.is_empty() || arg.eq_ignore_ascii_case("random") {
                return StudioCommand::SetSeed(None);
            }
            arg.parse::<u64>()
                .map(|seed| StudioCommand::SetSeed(Some(seed)))
                .unwrap_or_else(|_| invalid(command, format!("invalid seed '{arg}'")))
        }
        "guidance" => match arg.parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => StudioCommand::SetGuidance(value),
            _ => invalid(command, format!("invalid guidance '{arg}'")),
        },
        "steps" => match arg.parse::<u32>() {
            Ok(value) if value > 0 => StudioCommand::SetSteps(value),
            _ => invalid(command, format!("steps must be a positive integer, got '{arg}'")),
        },
        "show" => match arg.parse::<usize>() {
            Ok(value) if value > 0 => StudioCommand::Show(value - 1),
            _ => invalid(command, "/show needs a gallery number starting at 1"),
        },
        _ => {
            if arg.is_empty() {
                return StudioCommand::Idea(None);
            }
            match arg.parse::<usize>() {
                Ok(value) if value > 0 => StudioCommand::Idea(Some(value - 1)),
                _ => invalid(command, format!("invalid idea number '{arg}'")),
            }
        }
    }
}

fn parse_bare(command: &str) -> StudioCommand {
    match command {
        "regen" => StudioCommand::Regenerate,
        "retry" => StudioCommand::Retry,
        "gallery" => StudioCommand::Gallery,
        "new" => StudioCommand::NewPrompt,
        "status" => StudioCommand::Status,
        "help" => StudioCommand::Help,
        "quit" => StudioCommand::Quit,
        _ => StudioCommand::Unknown {
            command: command.to_string(),
            arg: String::new(),
        },
    }
}

pub fn parse_command(text: &str) -> StudioCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return StudioCommand::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            let Some(spec) = find_command(&command) else {
                return StudioCommand::Unknown {
                    command,
                    arg: arg.to_string(),
                };
            };

            return match spec.args {
                ArgKind::None if !arg.is_empty() => {
                    invalid(&command, format!("/{command} takes no arguments"))
                }
                ArgKind::None => parse_bare(&command),
                ArgKind::Preset => parse_preset(&command, arg),
                ArgKind::Number => parse_number(&command, arg),
                ArgKind::Text => StudioCommand::SetNegative(arg.to_string()),
                ArgKind::Path => StudioCommand::Save(parse_path_arg(arg)),
            };
        }
    }

    StudioCommand::Generate {
        prompt: raw_trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::registry::STUDIO_COMMANDS;

    #[test]
    fn plain_text_generates_trimmed_prompt() {
        assert_eq!(
            parse_command("  a cat on a roof \n"),
            StudioCommand::Generate {
                prompt: "a cat on a roof".to_string()
            }
        );
        assert_eq!(parse_command("   "), StudioCommand::Noop);
    }

    #[test]
    fn preset_commands_parse_and_clear() {
        assert_eq!(
            parse_command("/style Anime"),
            StudioCommand::SetStyle(Some(StylePreset::Anime))
        );
        assert_eq!(parse_command("/style none"), StudioCommand::SetStyle(None));
        assert_eq!(
            parse_command("/aspect 16:9"),
            StudioCommand::SetAspect(Some(AspectRatio::Wide))
        );
        assert_eq!(parse_command("/aspect auto"), StudioCommand::SetAspect(None));
        assert_eq!(parse_command("/size large"), StudioCommand::SetSize(SizePreset::Large));
    }

    #[test]
    fn unknown_preset_is_reported_not_applied() {
        match parse_command("/size huge") {
            StudioCommand::Invalid { command, reason } => {
                assert_eq!(command, "size");
                assert!(reason.contains("unknown size preset 'huge'"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(matches!(
            parse_command("/style"),
            StudioCommand::Invalid { .. }
        ));
    }

    #[test]
    fn numeric_commands_validate_ranges() {
        assert_eq!(parse_command("/seed 1234"), StudioCommand::SetSeed(Some(1234)));
        assert_eq!(parse_command("/seed random"), StudioCommand::SetSeed(None));
        assert_eq!(parse_command("/guidance 8.5"), StudioCommand::SetGuidance(8.5));
        assert_eq!(parse_command("/steps 50"), StudioCommand::SetSteps(50));
        assert_eq!(parse_command("/show 2"), StudioCommand::Show(1));
        assert_eq!(parse_command("/idea"), StudioCommand::Idea(None));
        assert_eq!(parse_command("/idea 3"), StudioCommand::Idea(Some(2)));
        assert!(matches!(parse_command("/steps 0"), StudioCommand::Invalid { .. }));
        assert!(matches!(parse_command("/show 0"), StudioCommand::Invalid { .. }));
        assert!(matches!(parse_command("/seed -4"), StudioCommand::Invalid { .. }));
    }

    #[test]
    fn save_accepts_quoted_paths() {
        assert_eq!(
            parse_command("/save \"/tmp/my image.png\""),
            StudioCommand::Save(Some("/tmp/my image.png".to_string()))
        );
        assert_eq!(parse_command("/save"), StudioCommand::Save(None));
    }

    #[test]
    fn bare_commands_reject_arguments() {
        assert_eq!(parse_command("/regen"), StudioCommand::Regenerate);
        assert_eq!(parse_command("/QUIT"), StudioCommand::Quit);
        assert!(matches!(
            parse_command("/regen now"),
            StudioCommand::Invalid { .. }
        ));
    }

    #[test]
    fn every_bare_command_has_its_own_meaning() {
        for spec in STUDIO_COMMANDS.iter().filter(|spec| spec.args == ArgKind::None) {
            let parsed = parse_command(&format!("/{}", spec.command));
            assert!(
                !matches!(parsed, StudioCommand::Unknown { .. } | StudioCommand::Invalid { .. }),
                "/{} parsed as {parsed:?}",
                spec.command
            );
        }
        assert_eq!(parse_command("/quit"), StudioCommand::Quit);
        assert_eq!(
            parse_bare("frobnicate"),
            StudioCommand::Unknown {
                command: "frobnicate".to_string(),
                arg: String::new(),
            }
        );
    }

    #[test]
    fn negative_prompt_keeps_text() {
        assert_eq!(
            parse_command("/negative blurry, low quality"),
            StudioCommand::SetNegative("blurry, low quality".to_string())
        );
        assert_eq!(parse_command("/negative"), StudioCommand::SetNegative(String::new()));
    }

    #[test]
    fn unknown_command_keeps_argument() {
        assert_eq!(
            parse_command("/magic foo bar"),
            StudioCommand::Unknown {
                command: "magic".to_string(),
                arg: "foo bar".to_string()
            }
        );
    }
}
