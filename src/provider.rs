// ============================================================================
// GENERATION PROVIDER BOUNDARY — prompts, error taxonomy, bounded retry
// ============================================================================
//
// The compositor is agnostic to where its rasters come from; this module
// specifies the seam to the external generative-image service. Errors are
// classified here and translated to user-facing messages by the app shell —
// they never reach the compositing core, and neither does the retry policy.

use std::fmt;
use std::time::Duration;

/// Requested output-resolution tier, mapped by the concrete provider to its
/// model/size selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Resolution {
    Low,
    Medium,
    #[default]
    Hd,
    Uhd,
    Expert8k,
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Low => "Low",
            Resolution::Medium => "Medium",
            Resolution::Hd => "HD",
            Resolution::Uhd => "UHD",
            Resolution::Expert8k => "8K Expert",
        }
    }

    pub fn all() -> &'static [Resolution] {
        &[
            Resolution::Low,
            Resolution::Medium,
            Resolution::Hd,
            Resolution::Uhd,
            Resolution::Expert8k,
        ]
    }
}

/// Scene options for a base-mockup generation request.
#[derive(Clone, Debug, Default)]
pub struct MockupOptions {
    pub category: String,
    pub quantity: String,
    pub ethnicity: String,
    pub physical_trait: String,
    pub gender: String,
    pub style: String,
    pub location: String,
    pub environment: String,
    pub city: String,
}

/// One refinement message from the chat-instruction UI.
#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub content: String,
}

/// Provider failures, classified at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Quota exhausted — the only variant worth retrying.
    RateLimited,
    PermissionDenied,
    Other(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::RateLimited => {
                write!(f, "The image service is rate-limited; try again shortly")
            }
            ProviderError::PermissionDenied => {
                write!(f, "The image service rejected the API credentials")
            }
            ProviderError::Other(e) => write!(f, "Image service error: {}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

/// External image source. Implementations own transport, credentials and
/// model selection; callers only see PNG bytes or a classified error.
pub trait MockupProvider {
    /// Generate a blank product scene from a textual prompt.
    fn generate_base(&self, prompt: &str, resolution: Resolution) -> Result<Vec<u8>, ProviderError>;

    /// Ask the provider to place a design onto a base scene (AI-driven
    /// placement, distinct from the local manual compositor).
    fn apply_design(
        &self,
        base_png: &[u8],
        design_png: &[u8],
        prompt: &str,
        resolution: Resolution,
    ) -> Result<Vec<u8>, ProviderError>;
}

/// Prompt for a blank base mockup: product scene with no design applied.
pub fn base_mockup_prompt(
    options: &MockupOptions,
    chat_history: &[ChatMessage],
    resolution: Resolution,
) -> String {
    let mut prompt = format!(
        "As an expert professional mockup photographer, create a square image of a \
         completely BLANK {category}.\n\
         Details: {quantity} units, ethnicity {ethnicity}, traits {traits}, gender {gender}, \
         style {style}, at {location} ({city}).\n\
         Environment: {environment}.\n\
         Requested resolution: {resolution}.",
        category = options.category,
        quantity = options.quantity,
        ethnicity = options.ethnicity,
        traits = options.physical_trait,
        gender = options.gender,
        style = options.style,
        location = options.location,
        city = options.city,
        environment = options.environment,
        resolution = resolution.label(),
    );
    if !chat_history.is_empty() {
        prompt.push_str(&format!("\nAdditional requests: {}.", join_chat(chat_history)));
    }
    prompt.push_str(
        "\nIMPORTANT: the product must be empty, with no logos or designs. \
         High-end commercial photographic quality.",
    );
    prompt
}

/// Prompt for AI-driven design placement onto an existing base scene.
pub fn apply_design_prompt(
    scale_percent: f32,
    chat_history: &[ChatMessage],
    resolution: Resolution,
) -> String {
    let mut prompt = format!(
        "PRECISION MONTAGE CALIBRATION.\n\
         Input 1: base scene. Input 2: design graphic.\n\
         RULES:\n\
         1. FOREGROUND SEGMENTATION: apply the design ONLY to products in the \
         foreground; leave background subjects and scenery completely untouched.\n\
         2. DISPLACEMENT MAPPING: the design must follow folds, wrinkles, curves \
         and material texture, integrated as if printed on the object, never as a \
         flat sticker.\n\
         3. LIGHT INTEGRATION: the graphic inherits the scene's light gradients, \
         cast shadows and ambient reflections.\n\
         4. UNIFORM SCALE: scale the design to {scale:.0}% of the printable area, \
         identically on every foreground subject.\n\
         5. OUTPUT QUALITY: {resolution}.",
        scale = scale_percent,
        resolution = resolution.label(),
    );
    if !chat_history.is_empty() {
        prompt.push_str(&format!("\n6. Specific adjustments: {}.", join_chat(chat_history)));
    }
    prompt.push_str(
        "\nABSOLUTE PRESERVATION: do not change faces, backgrounds, poses or \
         anything that is not the foreground product surface.",
    );
    prompt
}

fn join_chat(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(". ")
}

/// Run a provider call with bounded retry on rate-limit errors: up to
/// `retries` extra attempts, delay doubling each time. All other errors
/// fail immediately.
pub fn with_retry<T>(
    retries: u32,
    initial_delay: Duration,
    mut f: impl FnMut() -> Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    let mut delay = initial_delay;
    let mut attempts_left = retries;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(ProviderError::RateLimited) if attempts_left > 0 => {
                log_warn!("Provider rate-limited, retrying in {:?}", delay);
                std::thread::sleep(delay);
                delay *= 2;
                attempts_left -= 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retry_recovers_from_transient_rate_limits() {
        let calls = Cell::new(0);
        let result = with_retry(2, Duration::from_millis(1), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(ProviderError::RateLimited)
            } else {
                Ok("done")
            }
        });
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retry_gives_up_after_the_budget() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(2, Duration::from_millis(1), || {
            calls.set(calls.get() + 1);
            Err(ProviderError::RateLimited)
        });
        assert_eq!(result, Err(ProviderError::RateLimited));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn non_retryable_errors_fail_immediately() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(5, Duration::from_millis(1), || {
            calls.set(calls.get() + 1);
            Err(ProviderError::PermissionDenied)
        });
        assert_eq!(result, Err(ProviderError::PermissionDenied));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn prompts_carry_the_request_details() {
        let options = MockupOptions {
            category: "t-shirt".into(),
            quantity: "Duo".into(),
            ethnicity: "any".into(),
            physical_trait: "athletic".into(),
            gender: "any".into(),
            style: "casual".into(),
            location: "a street cafe".into(),
            environment: "morning light".into(),
            city: "Lisbon".into(),
        };
        let chat = vec![ChatMessage {
            content: "make it rainy".into(),
        }];
        let prompt = base_mockup_prompt(&options, &chat, Resolution::Uhd);
        assert!(prompt.contains("BLANK t-shirt"));
        assert!(prompt.contains("Duo units"));
        assert!(prompt.contains("UHD"));
        assert!(prompt.contains("make it rainy"));

        let prompt = apply_design_prompt(40.0, &[], Resolution::Hd);
        assert!(prompt.contains("40% of the printable area"));
        assert!(prompt.contains("HD"));
        assert!(!prompt.contains("Specific adjustments"));
    }
}
