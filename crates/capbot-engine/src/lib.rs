use std::time::Duration;

use capbot_contracts::chat::Intent;
use capbot_contracts::config::ModuleConfig;
use capbot_contracts::error::CommandError;
use capbot_contracts::events::{EventPayload, EventWriter};
use capbot_contracts::store::TemplateStore;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

mod fetch;
mod render;

pub use render::render_caption;

use fetch::Fetcher;

const EMPTY_LIST_REPLY: &str = "No images configured. Add one with /add <url>.";

/// What a command hands back to the host for delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Image { bytes: Vec<u8>, file_name: String },
}

/// The caption module instance: owns its template store, downloader,
/// configuration and event log. The host constructs one per loaded module
/// and routes parsed intents through [`CaptionEngine::handle`].
pub struct CaptionEngine {
    config: ModuleConfig,
    store: TemplateStore,
    fetcher: Fetcher,
    events: EventWriter,
}

impl CaptionEngine {
    pub fn new(config: ModuleConfig, events: EventWriter) -> anyhow::Result<Self> {
        let store = TemplateStore::new(&config.store_path);
        let fetcher = Fetcher::new(Duration::from_millis(config.fetch_timeout_ms))?;
        Ok(Self {
            config,
            store,
            fetcher,
            events,
        })
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn events(&self) -> &EventWriter {
        &self.events
    }

    /// Command boundary. Every failure becomes a short reply for the chat;
    /// nothing escapes as a crash into the host. Event-log trouble is
    /// swallowed here for the same reason.
    pub fn handle(&self, intent: &Intent, reply_text: Option<&str>) -> Reply {
        let _ = self.events.emit(
            "command_received",
            payload(json!({ "action": intent.action, "raw": intent.raw })),
        );
        match self.dispatch(intent, reply_text) {
            Ok(reply) => reply,
            Err(err) => {
                let _ = self.events.emit(
                    "command_failed",
                    payload(json!({ "action": intent.action, "error": err.to_string() })),
                );
                Reply::Text(err.to_string())
            }
        }
    }

    fn dispatch(
        &self,
        intent: &Intent,
        reply_text: Option<&str>,
    ) -> Result<Reply, CommandError> {
        match intent.action.as_str() {
            "add_image" => self.add_image(arg_str(intent, "url")),
            "list_images" => self.list_images(),
            "delete_images" => self.delete_images(arg_str(intent, "target")),
            "clear_images" => self.clear_images(),
            "render_meme" => self.render_meme(intent, reply_text),
            "help" => Ok(Reply::Text(help_text())),
            "unknown" => Ok(Reply::Text(format!(
                "Unknown command /{}. Try /help.",
                arg_str(intent, "command")
            ))),
            _ => Ok(Reply::Text(help_text())),
        }
    }

    fn add_image(&self, url: &str) -> Result<Reply, CommandError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CommandError::MissingArgument(
                "an image URL (usage: /add <url>)",
            ));
        }
        let count = self.store.add(url)?;
        let _ = self.events.emit(
            "image_added",
            payload(json!({ "url": url, "count": count })),
        );
        Ok(Reply::Text(format!("Added image #{count}")))
    }

    fn list_images(&self) -> Result<Reply, CommandError> {
        let urls = self.store.list()?;
        if urls.is_empty() {
            return Ok(Reply::Text(EMPTY_LIST_REPLY.to_string()));
        }
        let lines: Vec<String> = urls
            .iter()
            .enumerate()
            .map(|(idx, url)| format!("{}. {}", idx + 1, url))
            .collect();
        Ok(Reply::Text(lines.join("\n")))
    }

    fn delete_images(&self, target: &str) -> Result<Reply, CommandError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(CommandError::MissingArgument(
                "an index or range (usage: /del <n> or /del <start>-<end>)",
            ));
        }
        match parse_delete_target(target)? {
            DeleteTarget::Single(index) => {
                let removed = self.store.remove(index)?;
                let _ = self.events.emit(
                    "images_deleted",
                    payload(json!({ "index": index, "url": removed })),
                );
                Ok(Reply::Text(format!("Removed {removed}")))
            }
            DeleteTarget::Range(start, end) => {
                let count = self.store.remove_range(start, end)?;
                let _ = self.events.emit(
                    "images_deleted",
                    payload(json!({ "start": start, "end": end, "count": count })),
                );
                Ok(Reply::Text(format!("Removed {count} image(s)")))
            }
        }
    }

    fn clear_images(&self) -> Result<Reply, CommandError> {
        self.store.clear()?;
        Ok(Reply::Text("Image list cleared.".to_string()))
    }

    fn render_meme(
        &self,
        intent: &Intent,
        reply_text: Option<&str>,
    ) -> Result<Reply, CommandError> {
        let caption = intent
            .caption
            .as_deref()
            .or(reply_text)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(CommandError::MissingArgument(
                "caption text (write some text or reply to a message)",
            ))?;

        let urls = self.store.list()?;
        if urls.is_empty() {
            return Ok(Reply::Text(EMPTY_LIST_REPLY.to_string()));
        }
        let index = intent
            .command_args
            .get("index")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize;
        if index == 0 || index > urls.len() {
            return Err(CommandError::IndexOutOfRange {
                index,
                len: urls.len(),
            });
        }
        let url = &urls[index - 1];

        let bytes = self.fetcher.fetch(url)?;
        let _ = self.events.emit(
            "image_fetched",
            payload(json!({ "url": url, "bytes": bytes.len() })),
        );

        let rendered = render::render_caption(&bytes, caption, &self.config)?;
        let file_name = format!("meme-{}.jpg", short_id(url, caption));
        let _ = self.events.emit(
            "meme_rendered",
            payload(json!({
                "url": url,
                "caption_chars": caption.chars().count(),
                "file_name": file_name,
                "bytes": rendered.len(),
            })),
        );

        Ok(Reply::Image {
            bytes: rendered,
            file_name,
        })
    }
}

enum DeleteTarget {
    Single(usize),
    Range(usize, usize),
}

fn parse_delete_target(target: &str) -> Result<DeleteTarget, CommandError> {
    if let Some((start, end)) = target.split_once('-') {
        let start = parse_index(start.trim(), target)?;
        let end = parse_index(end.trim(), target)?;
        return Ok(DeleteTarget::Range(start, end));
    }
    Ok(DeleteTarget::Single(parse_index(target, target)?))
}

fn parse_index(text: &str, target: &str) -> Result<usize, CommandError> {
    text.parse::<usize>()
        .map_err(|_| CommandError::InvalidRangeSyntax(target.to_string()))
}

fn help_text() -> String {
    [
        "/meme [index] [caption] - caption a stored image (reply text is used when no caption is given)",
        "/add <url> - add an image URL",
        "/del <index|start-end> - delete one image or a range",
        "/list - list stored images",
        "/clear - empty the image list",
        "/help - this menu",
    ]
    .join("\n")
}

fn payload(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}

fn short_id(url: &str, caption: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(caption.as_bytes());
    hex::encode(&hasher.finalize()[..4])
}

fn arg_str<'a>(intent: &'a Intent, key: &str) -> &'a str {
    intent
        .command_args
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use capbot_contracts::chat::parse_intent;
    use capbot_contracts::config::ModuleConfig;
    use capbot_contracts::events::EventWriter;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use serde_json::Value;

    use super::{CaptionEngine, Reply, EMPTY_LIST_REPLY};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 120, 90]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode test png");
        bytes
    }

    /// One-shot HTTP server on an ephemeral port; answers the first request
    /// with the given body and exits.
    fn serve_once(body: Vec<u8>) -> (thread::JoinHandle<()>, String) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("server addr");
        let handle = thread::spawn(move || {
            if let Ok((mut socket, _)) = listener.accept() {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf);
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes());
                let _ = socket.write_all(&body);
            }
        });
        (handle, format!("http://{addr}/template.png"))
    }

    fn engine_in(temp: &tempfile::TempDir) -> anyhow::Result<CaptionEngine> {
        let config = ModuleConfig {
            font_path: "/definitely/not/a/font.ttf".into(),
            store_path: temp.path().join("images.txt"),
            ..ModuleConfig::default()
        };
        let events = EventWriter::new(temp.path().join("events.jsonl"), "test-invocation");
        CaptionEngine::new(config, events)
    }

    fn event_types(temp: &tempfile::TempDir) -> Vec<String> {
        std::fs::read_to_string(temp.path().join("events.jsonl"))
            .unwrap_or_default()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    fn text_of(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            Reply::Image { file_name, .. } => panic!("expected text, got image {file_name}"),
        }
    }

    #[test]
    fn add_list_meme_flow_produces_a_jpeg_artifact() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        let (server, url) = serve_once(png_bytes(320, 240));

        let reply = text_of(engine.handle(&parse_intent(&format!("/add {url}")), None));
        assert_eq!(reply, "Added image #1");

        let listing = text_of(engine.handle(&parse_intent("/list"), None));
        assert_eq!(listing, format!("1. {url}"));

        let Reply::Image { bytes, file_name } = engine.handle(&parse_intent("/meme 1 hello world"), None)
        else {
            panic!("expected an image reply");
        };
        assert!(file_name.starts_with("meme-") && file_name.ends_with(".jpg"));
        let decoded = image::load_from_memory(&bytes)?;
        assert_eq!((decoded.width(), decoded.height()), (320, 240));

        let types = event_types(&temp);
        assert_eq!(types.first().map(String::as_str), Some("command_received"));
        let fetched = types.iter().position(|t| t == "image_fetched");
        let rendered = types.iter().position(|t| t == "meme_rendered");
        assert!(fetched.is_some() && rendered.is_some());
        assert!(fetched < rendered);

        server.join().ok();
        Ok(())
    }

    #[test]
    fn reply_text_is_used_when_caption_is_missing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        let (server, url) = serve_once(png_bytes(100, 80));
        engine.handle(&parse_intent(&format!("/add {url}")), None);

        let reply = engine.handle(&parse_intent("/meme"), Some("quoted reply text"));
        assert!(matches!(reply, Reply::Image { .. }));

        server.join().ok();
        Ok(())
    }

    #[test]
    fn whitespace_only_caption_is_reported_before_any_fetch() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        engine.handle(&parse_intent("/add http://127.0.0.1:1/x.png"), None);

        let reply = text_of(engine.handle(&parse_intent("/meme"), Some("   \n  ")));
        assert!(reply.contains("missing caption text"), "got: {reply}");

        let types = event_types(&temp);
        assert!(!types.iter().any(|t| t == "image_fetched"));
        assert!(types.iter().any(|t| t == "command_failed"));
        Ok(())
    }

    #[test]
    fn empty_store_renders_nothing_and_says_so() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        let reply = text_of(engine.handle(&parse_intent("/meme hello"), None));
        assert_eq!(reply, EMPTY_LIST_REPLY);

        let listing = text_of(engine.handle(&parse_intent("/list"), None));
        assert_eq!(listing, EMPTY_LIST_REPLY);
        Ok(())
    }

    #[test]
    fn unreachable_url_reports_a_fetch_error_and_skips_the_render() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        let probe = TcpListener::bind("127.0.0.1:0")?;
        let dead_url = format!("http://{}/x.png", probe.local_addr()?);
        drop(probe);

        engine.handle(&parse_intent(&format!("/add {dead_url}")), None);
        let reply = text_of(engine.handle(&parse_intent("/meme oops"), None));
        assert!(reply.contains("image download failed"), "got: {reply}");

        let types = event_types(&temp);
        assert!(!types.iter().any(|t| t == "meme_rendered"));
        assert!(types.iter().any(|t| t == "command_failed"));
        Ok(())
    }

    #[test]
    fn meme_index_out_of_range_is_reported() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        engine.handle(&parse_intent("/add http://x.example/a.png"), None);

        let reply = text_of(engine.handle(&parse_intent("/meme 5 hi"), None));
        assert!(reply.contains("out of range"), "got: {reply}");
        Ok(())
    }

    #[test]
    fn delete_command_handles_single_range_and_bad_input() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        for n in 1..=4 {
            engine.handle(&parse_intent(&format!("/add http://x.example/{n}.png")), None);
        }

        let reply = text_of(engine.handle(&parse_intent("/del 2"), None));
        assert_eq!(reply, "Removed http://x.example/2.png");

        let reply = text_of(engine.handle(&parse_intent("/del 1-2"), None));
        assert_eq!(reply, "Removed 2 image(s)");
        assert_eq!(
            text_of(engine.handle(&parse_intent("/list"), None)),
            "1. http://x.example/4.png"
        );

        let reply = text_of(engine.handle(&parse_intent("/del two"), None));
        assert!(reply.contains("invalid index or range"), "got: {reply}");

        let reply = text_of(engine.handle(&parse_intent("/del"), None));
        assert!(reply.contains("missing"), "got: {reply}");
        Ok(())
    }

    #[test]
    fn clear_always_reports_success() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        assert_eq!(
            text_of(engine.handle(&parse_intent("/clear"), None)),
            "Image list cleared."
        );
        engine.handle(&parse_intent("/add http://x.example/a.png"), None);
        assert_eq!(
            text_of(engine.handle(&parse_intent("/clear"), None)),
            "Image list cleared."
        );
        assert_eq!(
            text_of(engine.handle(&parse_intent("/list"), None)),
            EMPTY_LIST_REPLY
        );
        Ok(())
    }

    #[test]
    fn add_without_url_is_a_missing_argument() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        let reply = text_of(engine.handle(&parse_intent("/add"), None));
        assert!(reply.contains("missing an image URL"), "got: {reply}");
        Ok(())
    }

    #[test]
    fn help_and_unknown_commands_reply_with_guidance() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let engine = engine_in(&temp)?;
        let help = text_of(engine.handle(&parse_intent("/help"), None));
        assert!(help.contains("/meme") && help.contains("/add"));

        let unknown = text_of(engine.handle(&parse_intent("/frobnicate"), None));
        assert!(unknown.contains("Unknown command /frobnicate"));
        Ok(())
    }
}
