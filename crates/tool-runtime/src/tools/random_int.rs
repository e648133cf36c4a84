//! Random integer tool: returns `n` with `0 <= n < max`.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::sync::Mutex;
use tracing::debug;

use crate::tool::{Tool, ToolDefinition, ToolError};

pub const RANDOM_INT_TOOL: &str = "randomInt";
pub const DEFAULT_MAX: u64 = 100;

/// Validated arguments for `randomInt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomIntArgs {
    /// Exclusive upper bound, always >= 1.
    pub max: u64,
}

impl Default for RandomIntArgs {
    fn default() -> Self {
        Self { max: DEFAULT_MAX }
    }
}

impl RandomIntArgs {
    /// Parse and validate raw JSON arguments.
    ///
    /// `null` or a missing `max` falls back to the default. Integral floats
    /// (`10.0`) are accepted since some vendors encode every number as a double.
    pub fn parse(input: &Value) -> Result<Self, ToolError> {
        let object = match input {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(ToolError::InvalidArgument(format!(
                    "arguments must be an object, got {}",
                    other
                )))
            }
        };

        let max = match object.get("max") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(value) => value,
        };

        let parsed = if let Some(n) = max.as_u64() {
            Some(n)
        } else if let Some(n) = max.as_i64() {
            // as_u64 failed, so this is negative
            debug!(max = n, "Rejecting negative max");
            None
        } else if let Some(f) = max.as_f64() {
            if f.fract() == 0.0 && f >= 1.0 && f <= u64::MAX as f64 {
                Some(f as u64)
            } else {
                None
            }
        } else {
            None
        };

        match parsed {
            Some(n) if n >= 1 => Ok(Self { max: n }),
            _ => Err(ToolError::InvalidArgument(format!(
                "max must be a positive integer, got {}",
                max
            ))),
        }
    }
}

/// Picks a pseudo-random integer below `max`.
pub struct RandomIntTool {
    rng: Mutex<StdRng>,
}

impl RandomIntTool {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick(&self, args: RandomIntArgs) -> Result<u64, ToolError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ToolError::ExecutionFailed("random generator poisoned".to_string()))?;
        Ok(rng.gen_range(0..args.max))
    }
}

impl Default for RandomIntTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RandomIntTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: RANDOM_INT_TOOL.to_string(),
            description: "Returns a random integer n with 0 <= n < max.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "max": {
                        "type": "integer",
                        "minimum": 1,
                        "default": DEFAULT_MAX,
                        "description": "Exclusive upper bound (default 100)"
                    }
                }
            }),
        }
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        let args = RandomIntArgs::parse(&input)?;
        let n = self.pick(args)?;
        debug!(max = args.max, n, "randomInt picked");
        Ok(n.to_string())
    }
}
