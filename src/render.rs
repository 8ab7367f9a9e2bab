use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig};
use base64::{alphabet, Engine};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_with::skip_serializing_none;
use tracing::{debug, info};
use uuid::Uuid;

use crate::gemini::FloralModel;
use crate::models::{FloralAnalysisResponse, Suggestion};

// Inline image data is not always padded.
const DATA_URL_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq)]
pub enum CardImage {
    Loading,
    Ready(String),
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardImageState {
    LoadingImage,
    HasImage,
    NoImage,
}

impl CardImage {
    pub fn state(&self) -> CardImageState {
        match self {
            CardImage::Loading => CardImageState::LoadingImage,
            CardImage::Ready(_) => CardImageState::HasImage,
            CardImage::Unavailable => CardImageState::NoImage,
        }
    }
}

/// One suggestion on screen. Mounting starts its preview request; the result
/// is only written back while the card is still mounted.
pub struct SuggestionCard {
    pub index: usize,
    pub suggestion: Arc<Suggestion>,
    image: Arc<RwLock<CardImage>>,
    mounted: Arc<AtomicBool>,
}

impl SuggestionCard {
    pub fn mount(index: usize, suggestion: Suggestion, model: Arc<dyn FloralModel>, api_key: String) -> Self {
        let card = Self {
            index,
            suggestion: Arc::new(suggestion),
            image: Arc::new(RwLock::new(CardImage::Loading)),
            mounted: Arc::new(AtomicBool::new(true)),
        };

        let suggestion = card.suggestion.clone();
        let image = card.image.clone();
        let mounted = card.mounted.clone();
        tokio::spawn(async move {
            let result = model.generate_floral_image(&suggestion, &api_key).await;
            let mut slot = image.write();
            if !mounted.load(Ordering::Acquire) {
                debug!("Discarding preview for unmounted card {}", index);
                return;
            }
            *slot = match result {
                Some(url) => CardImage::Ready(url),
                None => CardImage::Unavailable,
            };
        });

        card
    }

    pub fn image(&self) -> CardImage { self.image.read().clone() }

    /// Stops the pending result from landing. The request itself keeps running.
    pub fn unmount(&self) {
        let _slot = self.image.write();
        self.mounted.store(false, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn image_slot(&self) -> Arc<RwLock<CardImage>> { self.image.clone() }

    fn snapshot(&self, view_id: Uuid) -> CardSnapshot {
        let image = self.image.read();
        CardSnapshot {
            index: self.index,
            suggestion: (*self.suggestion).clone(),
            image: image.state(),
            // Unavailable cards still have a placeholder to show.
            image_url: (!matches!(*image, CardImage::Loading))
                .then(|| format!("/api/cards/{}/image?view={}", self.index, view_id)),
        }
    }
}

pub struct ResultView {
    pub id: Uuid,
    pub rendered_at: DateTime<Utc>,
    pub analysis: String,
    pub identified_flowers: Vec<String>,
    pub cards: Vec<SuggestionCard>,
}

impl ResultView {
    /// Lays out one card per suggestion, in the order received, and fires
    /// every preview request at once.
    pub fn mount(response: FloralAnalysisResponse, model: Arc<dyn FloralModel>, api_key: &str) -> Self {
        let FloralAnalysisResponse { analysis, identified_flowers, suggestions } = response;
        info!("🖼️ Mounting {} suggestion cards", suggestions.len());
        let cards = suggestions
            .into_iter()
            .enumerate()
            .map(|(index, s)| SuggestionCard::mount(index, s, model.clone(), api_key.to_string()))
            .collect();
        Self { id: Uuid::new_v4(), rendered_at: Utc::now(), analysis, identified_flowers, cards }
    }

    pub fn card(&self, index: usize) -> Option<&SuggestionCard> { self.cards.get(index) }

    pub fn snapshot(&self) -> ResultSnapshot {
        ResultSnapshot {
            id: self.id,
            rendered_at: self.rendered_at,
            analysis: self.analysis.clone(),
            identified_flowers: self.identified_flowers.clone(),
            cards: self.cards.iter().map(|c| c.snapshot(self.id)).collect(),
        }
    }
}

impl Drop for ResultView {
    fn drop(&mut self) {
        for card in &self.cards {
            card.unmount();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSnapshot {
    pub id: Uuid,
    pub rendered_at: DateTime<Utc>,
    pub analysis: String,
    pub identified_flowers: Vec<String>,
    pub cards: Vec<CardSnapshot>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSnapshot {
    pub index: usize,
    pub suggestion: Suggestion,
    pub image: CardImageState,
    pub image_url: Option<String>,
}

/// Splits `data:<mime>;base64,<payload>` into its MIME type and decoded bytes.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = DATA_URL_ENGINE.decode(payload).ok()?;
    Some((if mime.is_empty() { "application/octet-stream".to_string() } else { mime.to_string() }, bytes))
}

fn safe_color(color: &str) -> Option<&str> {
    let c = color.trim();
    let hex = c.strip_prefix('#').is_some_and(|h| matches!(h.len(), 3 | 4 | 6 | 8) && h.chars().all(|ch| ch.is_ascii_hexdigit()));
    let named = !c.is_empty() && c.len() <= 20 && c.chars().all(|ch| ch.is_ascii_alphabetic());
    (hex || named).then_some(c)
}

/// Picture-frame icon over a gradient of the suggestion's palette, shown when
/// a card has no generated image.
pub fn placeholder_svg(suggestion: &Suggestion) -> String {
    let mut colors = suggestion.color_palette.iter().filter_map(|c| safe_color(c));
    let from = colors.next().unwrap_or("#F5F5F4");
    let to = colors.next().unwrap_or(from);

    format!(r##"<svg width="400" height="300" xmlns="http://www.w3.org/2000/svg">
    <defs>
        <linearGradient id="grad" x1="0%" y1="0%" x2="100%" y2="100%">
            <stop offset="0%" style="stop-color:{from};stop-opacity:0.35" />
            <stop offset="100%" style="stop-color:{to};stop-opacity:0.2" />
        </linearGradient>
    </defs>
    <rect width="400" height="300" fill="url(#grad)" />
    <g fill="none" stroke="#D6D3D1" stroke-width="6" stroke-linecap="round" stroke-linejoin="round">
        <rect x="152" y="102" width="96" height="96" rx="12" />
        <circle cx="182" cy="132" r="10" />
        <path d="M248 170 L218 140 L158 198" />
    </g>
</svg>"##)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GeminiError;
    use crate::models::{sample_suggestion, ImagePayload, Language};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Images for titles starting with "fail" come back empty; everything
    /// else waits for `gate` when one is set.
    struct FakePainter {
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl FloralModel for FakePainter {
        async fn analyze_floral_request(
            &self, _: &str, _: Option<&ImagePayload>, _: Language, _: &str,
        ) -> Result<FloralAnalysisResponse, GeminiError> {
            unreachable!("cards never analyze")
        }

        async fn generate_floral_image(&self, suggestion: &Suggestion, _: &str) -> Option<String> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            (!suggestion.title.starts_with("fail")).then(|| format!("data:image/png;base64,{}", "iVBORw0KGgo"))
        }
    }

    fn response(titles: &[&str]) -> FloralAnalysisResponse {
        FloralAnalysisResponse {
            analysis: "Soft and bright".into(),
            identified_flowers: vec![],
            suggestions: titles.iter().map(|t| sample_suggestion(t)).collect(),
        }
    }

    async fn settled(view: &ResultView) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while view.cards.iter().any(|c| c.image() == CardImage::Loading) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("card images did not settle");
    }

    #[tokio::test]
    async fn one_failed_preview_leaves_other_cards_alone() {
        let view = ResultView::mount(response(&["A", "fail B", "C"]), Arc::new(FakePainter { gate: None }), "k");
        settled(&view).await;

        let states: Vec<_> = view.cards.iter().map(|c| c.image().state()).collect();
        assert_eq!(states, vec![CardImageState::HasImage, CardImageState::NoImage, CardImageState::HasImage]);
        let titles: Vec<_> = view.snapshot().cards.into_iter().map(|c| c.suggestion.title).collect();
        assert_eq!(titles, vec!["A", "fail B", "C"]);
    }

    #[tokio::test]
    async fn failed_preview_links_to_its_placeholder() {
        let view = ResultView::mount(response(&["fail A"]), Arc::new(FakePainter { gate: None }), "k");
        settled(&view).await;
        let json = serde_json::to_value(view.snapshot()).unwrap();
        assert_eq!(json["cards"][0]["image"], "no-image");
        assert!(json["cards"][0]["imageUrl"].as_str().unwrap().starts_with("/api/cards/0/image?view="));
    }

    #[tokio::test]
    async fn unmounted_card_drops_late_result() {
        let gate = Arc::new(Notify::new());
        let view = ResultView::mount(response(&["A"]), Arc::new(FakePainter { gate: Some(gate.clone()) }), "k");
        let slot = view.cards[0].image_slot();
        let loading = view.snapshot();
        assert_eq!(loading.cards[0].image, CardImageState::LoadingImage);
        assert_eq!(loading.cards[0].image_url, None);

        drop(view);
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*slot.read(), CardImage::Loading);
    }

    #[tokio::test]
    async fn zero_suggestions_render_no_cards() {
        let view = ResultView::mount(response(&[]), Arc::new(FakePainter { gate: None }), "k");
        assert!(view.snapshot().cards.is_empty());
    }

    #[tokio::test]
    async fn ready_cards_expose_an_image_url() {
        let view = ResultView::mount(response(&["A"]), Arc::new(FakePainter { gate: None }), "k");
        settled(&view).await;
        let json = serde_json::to_value(view.snapshot()).unwrap();
        assert_eq!(json["cards"][0]["image"], "has-image");
        assert!(json["cards"][0]["imageUrl"].as_str().unwrap().starts_with("/api/cards/0/image"));
        assert_eq!(json["identifiedFlowers"], serde_json::json!([]));
    }

    #[test]
    fn data_urls_decode() {
        let (mime, bytes) = decode_data_url("data:image/jpeg;base64,/9j/").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
        let (mime, bytes) = decode_data_url("data:image/png;base64,iVBORw0KGgo").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
        assert!(decode_data_url("https://example.com/a.png").is_none());
        assert!(decode_data_url("data:image/png,plain").is_none());
    }

    #[test]
    fn placeholder_only_uses_safe_colors() {
        let mut suggestion = sample_suggestion("A");
        suggestion.color_palette = vec!["\"/><script>".into(), "#abc".into(), "lavender".into()];
        let svg = placeholder_svg(&suggestion);
        assert!(svg.contains("stop-color:#abc"));
        assert!(svg.contains("stop-color:lavender"));
        assert!(!svg.contains("script"));
    }
}
