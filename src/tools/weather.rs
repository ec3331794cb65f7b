//! Simulated weather with structured output.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{get_string_arg, structured_result, Arguments, ToolHandler};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::mcp::schema::{FieldSchema, ObjectSchema};

const CONDITIONS: [&str; 4] = ["sunny", "cloudy", "rainy", "windy"];

/// Weather report returned as structured content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub location: String,
    pub temperature: i64,
    pub unit: String,
    pub conditions: String,
    pub humidity: i64,
    /// RFC 3339 time the reading was made up.
    pub observed_at: String,
}

impl Weather {
    /// Invent a plausible reading for `location`.
    pub fn simulate(location: impl Into<String>) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            location: location.into(),
            temperature: rng.gen_range(15..35),
            unit: "celsius".to_string(),
            conditions: CONDITIONS
                .choose(&mut rng)
                .copied()
                .unwrap_or("sunny")
                .to_string(),
            humidity: rng.gen_range(40..80),
            observed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn schema() -> ObjectSchema {
        ObjectSchema::new()
            .required_field("location", FieldSchema::string())
            .required_field("temperature", FieldSchema::integer())
            .required_field("unit", FieldSchema::string().one_of(["celsius"]))
            .required_field(
                "conditions",
                FieldSchema::string().one_of(CONDITIONS),
            )
            .required_field("humidity", FieldSchema::integer())
            .required_field("observed_at", FieldSchema::string())
    }
}

/// Reports simulated weather.
pub struct WeatherTool;

#[async_trait]
impl ToolHandler for WeatherTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_weather".to_string(),
            title: Some("Get Weather".to_string()),
            description: "Get current weather for a location (simulated)".to_string(),
            input_schema: ObjectSchema::new().required_field(
                "location",
                FieldSchema::string().description("City name or coordinates"),
            ),
            output_schema: Some(Weather::schema()),
            // Simulated, so results vary but nothing leaves the server.
            annotations: Some(ToolAnnotations::read_only("Get Weather", false)),
        }
    }

    async fn execute(&self, _ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
        let weather = Weather::simulate(get_string_arg(&args, "location")?);
        let text = serde_json::to_string_pretty(&weather)?;
        Ok(structured_result(text, serde_json::to_value(&weather)?))
    }
}
