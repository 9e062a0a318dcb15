#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArgKind {
    None,
    Preset,
    Number,
    Text,
    Path,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub args: ArgKind,
}

pub(crate) const STUDIO_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "style",
        args: ArgKind::Preset,
    },
    CommandSpec {
        command: "size",
        args: ArgKind::Preset,
    },
    CommandSpec {
        command: "aspect",
        args: ArgKind::Preset,
    },
    CommandSpec {
        command: "seed",
        args: ArgKind::Number,
    },
    CommandSpec {
        command: "guidance",
        args: ArgKind::Number,
    },
    CommandSpec {
        command: "steps",
        args: ArgKind::Number,
    },
    CommandSpec {
        command: "negative",
        args: ArgKind::Text,
    },
    CommandSpec {
        command: "regen",
        args: ArgKind::None,
    },
    CommandSpec {
        command: "retry",
        args: ArgKind::None,
    },
    CommandSpec {
        command: "gallery",
        args: ArgKind::None,
    },
    CommandSpec {
        command: "show",
        args: ArgKind::Number,
    },
    CommandSpec {
        command: "save",
        args: ArgKind::Path,
    },
    CommandSpec {
        command: "new",
        args: ArgKind::None,
    },
    CommandSpec {
        command: "idea",
        args: ArgKind::Number,
    },
    CommandSpec {
        command: "status",
        args: ArgKind::None,
    },
    CommandSpec {
        command: "help",
        args: ArgKind::None,
    },
    CommandSpec {
        command: "quit",
        args: ArgKind::None,
    },
];

/// Words that clear an optional preset (`/style none`).
pub(crate) const CLEAR_WORDS: &[&str] = &["none", "off", "clear", "auto"];

pub const STUDIO_HELP_COMMANDS: &[&str] = &[
    "/style <name|none>",
    "/size <small|medium|large>",
    "/aspect <1:1|3:2|16:9|2:3|none>",
    "/seed <n|random>",
    "/guidance <f>",
    "/steps <n>",
    "/negative <text>",
    "/regen",
    "/retry",
    "/gallery",
    "/show <n>",
    "/save [path]",
    "/new",
    "/idea [n]",
    "/status",
    "/help",
    "/quit",
];

pub(crate) fn find_command(command: &str) -> Option<CommandSpec> {
    STUDIO_COMMANDS
        .iter()
        .find(|spec| spec.command == command)
        .copied()
}
