use chrono::{DateTime, Local};

use crate::models::ReportKind;

const DEFAULT_MORNING_PROMPT: &str = r#"Current Date and Time: {date}, {time}.
Role: Senior Financial Analyst.
Task: Provide a "Morning Magnificent 7 Review", a recap of the previous US trading session.

1. **Performance**: Search for the most recent closing prices (likely yesterday's close) for: Apple (AAPL), Microsoft (MSFT), Alphabet (GOOGL), Amazon (AMZN), NVIDIA (NVDA), Meta (META), and Tesla (TSLA).
2. **Data Table**: Create a clean Markdown table with columns: Stock, Price, Change %.
3. **Key Movers**: Briefly explain the reason behind the biggest mover (news, earnings, etc.).

Output Language: {language}.
Format: Use Markdown. Keep it concise and readable on mobile."#;

const DEFAULT_EVENING_PROMPT: &str = r#"Current Date and Time: {date}, {time}.
Role: Senior Financial Analyst.
Task: Provide a "US Market Evening Briefing".

1. **Today's Major News**: Identify the most significant news, economic data, or earnings released today that are driving the market.
2. **Market Sentiment & Trend**: Assess the current market mood (Bullish/Bearish/Neutral) and the likely trend into the close.
3. **Outlook**: Give a brief prediction for the next session.

Output Language: {language}.
Format: Use Markdown. Keep it concise, professional, and readable on mobile."#;

// Prompt text per report kind. Templates may use `{date}`, `{time}` and
// `{language}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    morning: String,
    evening: String,
    language: String,
}

impl PromptTemplates {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            morning: DEFAULT_MORNING_PROMPT.to_string(),
            evening: DEFAULT_EVENING_PROMPT.to_string(),
            language: language.into(),
        }
    }

    pub fn with_morning(mut self, template: impl Into<String>) -> Self {
        self.morning = template.into();
        self
    }

    pub fn with_evening(mut self, template: impl Into<String>) -> Self {
        self.evening = template.into();
        self
    }

    pub fn render(&self, kind: ReportKind, now: DateTime<Local>) -> String {
        let template = match kind {
            ReportKind::Morning => &self.morning,
            ReportKind::Evening => &self.evening,
        };

        template
            .replace("{date}", &now.format("%A, %B %-d, %Y").to_string())
            .replace("{time}", &now.format("%-I:%M:%S %p").to_string())
            .replace("{language}", &self.language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn fixed_now() -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Local.from_local_datetime(&naive).single().unwrap()
    }

    #[test]
    fn morning_prompt_names_all_seven_tickers() {
        let prompt = PromptTemplates::new("English").render(ReportKind::Morning, fixed_now());
        for ticker in ["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA"] {
            assert!(prompt.contains(ticker), "missing {ticker}");
        }
        assert!(prompt.contains("Stock, Price, Change %"));
        assert!(prompt.contains("Tuesday, January 2, 2024"));
        assert!(prompt.contains("Output Language: English."));
    }

    #[test]
    fn evening_prompt_asks_for_sentiment_and_outlook() {
        let prompt = PromptTemplates::new("English").render(ReportKind::Evening, fixed_now());
        assert!(prompt.contains("Bullish/Bearish/Neutral"));
        assert!(prompt.contains("next session"));
        assert!(!prompt.contains("{date}"));
    }

    #[test]
    fn custom_templates_are_rendered() {
        let prompts = PromptTemplates::new("German").with_evening("Evening in {language} at {time}");
        assert_eq!(
            prompts.render(ReportKind::Evening, fixed_now()),
            "Evening in German at 8:00:00 AM"
        );
    }
}
