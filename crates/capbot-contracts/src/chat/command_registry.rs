#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "add",
        action: "add_image",
    },
    CommandSpec {
        command: "del",
        action: "delete_images",
    },
    CommandSpec {
        command: "delete",
        action: "delete_images",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "list",
        action: "list_images",
    },
    CommandSpec {
        command: "clear",
        action: "clear_images",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
];

pub(crate) const MEME_COMMANDS: &[&str] = &["meme", "caption"];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/meme", "/caption", "/add", "/del", "/list", "/clear", "/help",
];
