//! Response rendering for text-only surfaces

use crate::interface::{BotPlatform, BotResponse};

pub trait Formatter: Send + Sync {
    fn platform(&self) -> BotPlatform;
    fn format_response(&self, response: &BotResponse) -> String;
}

pub struct CliFormatter;

impl Formatter for CliFormatter {
    fn platform(&self) -> BotPlatform {
        BotPlatform::Cli
    }

    fn format_response(&self, response: &BotResponse) -> String {
        let mut output = response.content.clone();
        if let Some(image) = response.image() {
            output.push_str(&format!(
                "\n[{} attached, {} bytes]",
                image.filename.as_deref().unwrap_or("image"),
                image.content.len()
            ));
        }
        if !response.actions.is_empty() {
            let options: Vec<String> = response
                .actions
                .iter()
                .map(|a| format!("[{}]", a.label))
                .collect();
            output.push('\n');
            output.push_str(&options.join(" "));
        }
        output
    }
}

/// Telegram renders options as a reply keyboard, so only the text is formatted
pub struct TelegramFormatter;

impl Formatter for TelegramFormatter {
    fn platform(&self) -> BotPlatform {
        BotPlatform::Telegram
    }

    fn format_response(&self, response: &BotResponse) -> String {
        response.content.clone()
    }
}

pub struct FormatterFactory;

impl FormatterFactory {
    pub fn create(platform: BotPlatform) -> Box<dyn Formatter> {
        match platform {
            BotPlatform::Cli => Box::new(CliFormatter),
            BotPlatform::Telegram => Box::new(TelegramFormatter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Attachment;

    #[test]
    fn test_cli_lists_options_and_images() {
        let response = BotResponse::text("Pick one")
            .with_option("Forwards")
            .with_option("Reverse")
            .with_attachment(Attachment::chart_png(vec![0; 4]));

        let text = FormatterFactory::create(BotPlatform::Cli).format_response(&response);
        assert!(text.starts_with("Pick one"));
        assert!(text.contains("[chart.png attached, 4 bytes]"));
        assert!(text.ends_with("[Forwards] [Reverse]"));
    }

    #[test]
    fn test_telegram_keeps_text_only() {
        let response = BotResponse::text("Pick one").with_option("Forwards");
        let formatter = FormatterFactory::create(BotPlatform::Telegram);
        assert_eq!(formatter.platform(), BotPlatform::Telegram);
        assert_eq!(formatter.format_response(&response), "Pick one");
    }
}
