//! Prompt templates and reply parsing helpers

use crate::models::PlatformData;

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Full trend analysis prompt for a topic and its collected platform data
pub fn analysis_prompt(topic: &str, platform_data: &[PlatformData]) -> String {
    format!(
        r#"Analyze the following social media trend data for the topic: "{topic}"

Platform Data:
{data}

Please provide a comprehensive analysis including:
1. Overall trend summary and key insights
2. Sentiment analysis (positive/negative/neutral with a score from -1 to 1)
3. Growth prediction (rising/declining/stable/viral)
4. Platform-specific observations
5. Content patterns and themes
6. Audience engagement patterns
7. Actionable recommendations

Format your response in a clear, structured manner."#,
        data = pretty(&platform_data)
    )
}

pub fn insights_prompt(data: &serde_json::Value) -> String {
    format!(
        r#"Analyze the following social media trend data and generate actionable insights:

{data}

Please provide:
1. Key patterns observed across platforms
2. Optimal posting times and content formats
3. Hashtag recommendations
4. Sentiment analysis
5. Predicted trend direction (rising/declining/stable)
6. Specific, actionable recommendations

Format your response in clear, structured sections."#,
        data = pretty(data)
    )
}

pub fn summary_prompt(trends: &serde_json::Value) -> String {
    format!(
        r#"Summarize the following trends concisely (2-3 sentences):

{trends}

Focus on the most important patterns and emerging topics."#,
        trends = pretty(trends)
    )
}

pub fn prediction_prompt(content: &serde_json::Value, platform: &str) -> String {
    format!(
        r#"Analyze this content for {platform} and predict its performance:

Content: {content}

Provide a JSON response with:
1. score (0-100): Overall performance prediction
2. confidence (0-1): How confident you are in this prediction
3. factors: Key factors affecting performance (timing, contentType, hashtags, estimatedEngagement)
4. recommendations: Array of actionable recommendations

Return ONLY valid JSON, no additional text."#
    )
}

/// Locate a JSON object in model output
///
/// Prefers a fenced ```json block, then spans from the first `{` to the
/// last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        if let Some(end) = body.find("```") {
            let block = body[..end].trim();
            if block.starts_with('{') {
                return Some(block);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlatformType;

    #[test]
    fn test_analysis_prompt_embeds_topic_and_data() {
        let data = vec![PlatformData::failed(PlatformType::Tiktok, "not found")];
        let prompt = analysis_prompt("electric cars", &data);
        assert!(prompt.contains(r#"for the topic: "electric cars""#));
        assert!(prompt.contains("\"platform\": \"tiktok\""));
        assert!(prompt.contains("7. Actionable recommendations"));
    }

    #[test]
    fn test_prediction_prompt_names_platform() {
        let prompt = prediction_prompt(&serde_json::json!({"text": "hi"}), "instagram");
        assert!(prompt.starts_with("Analyze this content for instagram"));
        assert!(prompt.contains(r#"Content: {"text":"hi"}"#));
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("Sure! {\"a\": {\"b\": 1}} done"),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(
            extract_json_object("```json\n{\"score\": 1}\n```"),
            Some("{\"score\": 1}")
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }
}
