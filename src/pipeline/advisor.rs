//! AI helpers: chat, pest identification, crop recommendation, and the
//! prompt builders shared with the weather and dashboard flows.

use super::{AggregationPipeline, advisory_upstream, required};
use crate::cache::CacheKey;
use crate::providers::Invocation;
use crate::types::{
    CropRecommendation, CurrentWeather, FieldConditions, ForecastSet, InlineImage,
    PestDiagnosis, Prompt,
};
use crate::{KrishiError, Result};

impl AggregationPipeline {
    /// Free-form question to the advisory upstream. Not cached.
    pub async fn ask(&self, query: &str) -> Result<Invocation<String>> {
        let query = required(query, "query")?;
        let provider = advisory_upstream(&self.upstreams)?;
        let prompt = Prompt::text(query);
        let prompt = &prompt;
        self.invoker
            .invoke(provider.name(), "ask", move || provider.generate(prompt))
            .await
    }

    /// Identify a pest or disease from a photo of `crop`. Not cached.
    pub async fn identify_pest(
        &self,
        crop: &str,
        symptoms: Option<&str>,
        image: InlineImage,
    ) -> Result<Invocation<PestDiagnosis>> {
        let crop = required(crop, "crop")?;
        if image.data.is_empty() {
            return Err(KrishiError::Validation("image is required".to_string()));
        }
        let provider = advisory_upstream(&self.upstreams)?;
        let prompt =
            Prompt::text(pest_prompt(crop, symptoms.unwrap_or("").trim())).with_image(image);
        let prompt = &prompt;
        let invocation = self
            .invoker
            .invoke(provider.name(), "identify_pest", move || provider.generate(prompt))
            .await?;
        Ok(invocation.map(|text| PestDiagnosis::parse(&text)))
    }

    /// Suggest crops for the given field conditions.
    ///
    /// Cached by the normalized conditions; identical inputs within the
    /// recommendation TTL reuse the earlier answer.
    pub async fn recommend_crops(
        &self,
        conditions: &FieldConditions,
    ) -> Result<Invocation<CropRecommendation>> {
        let soil = required(&conditions.soil, "soil")?;
        let season = required(&conditions.season, "season")?;
        let state = required(&conditions.state, "state")?;
        for (field, value) in [
            ("rainfall", conditions.rainfall_mm),
            ("temperature", conditions.temperature_c),
        ] {
            if !value.is_finite() {
                return Err(KrishiError::Validation(format!("{field} must be a number")));
            }
        }
        let provider = advisory_upstream(&self.upstreams)?;

        let rainfall = conditions.rainfall_mm.to_string();
        let temperature = conditions.temperature_c.to_string();
        let key = CacheKey::new("crops", &[soil, season, state, &rainfall, &temperature]);
        let prompt = Prompt::text(crop_prompt(
            soil,
            season,
            state,
            conditions.rainfall_mm,
            conditions.temperature_c,
        ));
        let prompt = &prompt;

        self.cached_invoke(
            &self.recommendation_cache,
            &key,
            self.cache_config.recommendation_ttl,
            provider.name(),
            "recommend_crops",
            move || async move {
                provider
                    .generate(prompt)
                    .await
                    .map(|text| CropRecommendation::parse(&text))
            },
        )
        .await
    }
}

// ============================================================================
// Prompts
// ============================================================================

pub(crate) fn advice_prompt(current: &CurrentWeather, forecast: &ForecastSet) -> Prompt {
    let mut text = format!(
        "You are an expert agricultural advisor for India. A farmer in {} needs advice.\n\
         Current weather: {}, {}°C, {}% humidity.\n\
         5-day forecast:\n",
        current.city_name, current.condition, current.temperature, current.humidity
    );
    for day in forecast.days() {
        text.push_str(&format!(
            "- {}: Max {}°C, Min {}°C, {}\n",
            day.day_name, day.max_temp, day.min_temp, day.condition
        ));
    }
    text.push_str(
        "\nBased ONLY on this weather, provide 3-5 concise bullet points of \
         agricultural advice (irrigation, protection, livestock).",
    );
    Prompt::text(text)
}

pub(crate) fn news_prompt(location: &str) -> Prompt {
    Prompt::text(format!(
        "You are a helpful agricultural news assistant. \
         Provide 3 recent, one-sentence news headlines for farmers in or near {location}, India. \
         Focus on crops, weather alerts, or new schemes relevant to that region. \
         Format as a simple list with bullet points (* Headline 1...)."
    ))
}

fn pest_prompt(crop: &str, symptoms: &str) -> String {
    format!(
        "You are an expert plant pathologist in India. \
         A farmer uploaded this image of their '{crop}' crop. \
         Farmer's notes: '{symptoms}'.\n\n\
         1. Start with 'Namaskar Kisan Bhai,' and identify the disease in the image. \
         Explain the visual clues. Keep this under 150 words.\n\n\
         2. Write '{marker}' on its own line.\n\n\
         3. After the separator, start with 'Namaskar Kisan Bhai,' again and provide a detailed \
         treatment plan (Organic, Chemical, and Prevention sections).",
        marker = crate::types::advisory::TREATMENT_MARKER,
    )
}

fn crop_prompt(soil: &str, season: &str, state: &str, rainfall: f64, temperature: f64) -> String {
    format!(
        "You are an expert Indian agronomist. A farmer from {state} has provided their field conditions: \
         Soil Type: {soil}, Season: {season}, Avg Rainfall: {rainfall}mm, Avg Temp: {temperature}°C.\n\n\
         Please provide a detailed recommendation. Follow this exact format:\n\
         1.  **Recommended Crops:** List the top 3-5 suitable crops as a simple list (e.g., 'Cucumber, Bottle Gourd, Okra').\n\
         2.  Then, write '{marker}' as a separator on its own line.\n\
         3.  After the separator, write '### Detailed Analysis & Recommendations'.\n\
         4.  **Critical Analysis:** First, analyze the inputs. If any value is extreme or unlikely, point it out politely, \
         explain why it's a problem, and state that you are proceeding with a more realistic assumption.\n\
         5.  **Suitability Analysis:** Explain *why* the recommended crops are a good fit.\n\
         6.  **Market & Yield Potential:** Briefly mention the market demand and expected yield for these crops in the {state} region.\n\
         7.  **Growing Tips:** Provide a numbered list of 3-5 essential growing tips for these crops under the given \
         {soil} soil and {season} season conditions.",
        marker = crate::types::advisory::ANALYSIS_MARKER,
    )
}
