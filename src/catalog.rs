//! Request catalog: scenario definition and pre-encoded request bytes
//!
//! Every payload variant is encoded to its final HTTP/1.1 byte string once,
//! before the run starts. Workers share the catalog read-only, so the hot
//! path never formats a request.

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Accepted-status predicate for a payload variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    /// Any 2xx status counts as success
    Success,
    /// Exactly this status counts as success
    Status(u16),
    /// Any of these statuses counts as success
    AnyOf(Vec<u16>),
}

impl Expect {
    /// Whether the given status code satisfies the predicate
    pub fn matches(&self, status: u16) -> bool {
        match self {
            Expect::Success => (200..300).contains(&status),
            Expect::Status(s) => status == *s,
            Expect::AnyOf(set) => set.contains(&status),
        }
    }
}

impl Default for Expect {
    fn default() -> Self {
        Expect::Success
    }
}

/// One payload shape within a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadSpec {
    /// Variant name, used in metric keys
    pub name: String,

    /// Request body
    pub body: String,

    /// Which status codes classify an attempt as successful
    #[serde(default)]
    pub expect: Expect,

    /// Relative selection weight; all-absent means uniform selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl PayloadSpec {
    /// Create a variant accepting any 2xx response
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            expect: Expect::Success,
            weight: None,
        }
    }

    /// Set the accepted-status predicate
    pub fn with_expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    /// Set the selection weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// A benchmark scenario: target endpoint plus payload mix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Scenario name, used in logs and external-backend metric keys
    pub name: String,

    /// Target host
    pub host: String,

    /// Target port
    pub port: u16,

    /// Request path
    pub path: String,

    /// Extra request headers; Host, Connection and Content-Length are managed
    /// by the encoder and cannot be overridden here
    #[serde(default = "default_headers")]
    pub headers: Vec<(String, String)>,

    /// Payload variants in this scenario
    pub variants: Vec<PayloadSpec>,
}

fn default_headers() -> Vec<(String, String)> {
    vec![
        ("Content-Type".into(), "application/json".into()),
        ("Accept".into(), "application/json".into()),
    ]
}

impl ScenarioSpec {
    /// Create a scenario with the default JSON headers
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            path: "/".into(),
            headers: default_headers(),
            variants: Vec::new(),
        }
    }

    /// Set the request path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Add a payload variant
    pub fn with_variant(mut self, variant: PayloadSpec) -> Self {
        self.variants.push(variant);
        self
    }

    /// Validate the scenario
    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(Error::config("scenario has no payload variants"));
        }
        if !self.path.starts_with('/') {
            return Err(Error::config("request path must start with '/'"));
        }

        let weighted = self.variants.iter().filter(|v| v.weight.is_some()).count();
        if weighted != 0 && weighted != self.variants.len() {
            return Err(Error::config(
                "either all variants carry a weight or none do",
            ));
        }
        for v in &self.variants {
            if let Some(w) = v.weight {
                if !w.is_finite() || w <= 0.0 {
                    return Err(Error::config(format!(
                        "variant '{}' has non-positive weight",
                        v.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A payload variant with its pre-encoded request bytes
#[derive(Debug, Clone)]
pub struct Variant {
    name: String,
    request: Vec<u8>,
    expect: Expect,
}

impl Variant {
    /// Variant name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full raw request bytes, headers and body included
    pub fn request(&self) -> &[u8] {
        &self.request
    }

    /// Accepted-status predicate
    pub fn expect(&self) -> &Expect {
        &self.expect
    }
}

/// Immutable set of encoded request variants plus the selection policy
#[derive(Debug)]
pub struct RequestCatalog {
    variants: Vec<Variant>,
    picker: VariantPicker,
}

impl RequestCatalog {
    /// Encode every variant of the scenario
    ///
    /// Fails fast if the scenario is invalid or any payload cannot be encoded;
    /// nothing is retried at run time.
    pub fn build(spec: &ScenarioSpec) -> Result<Self> {
        spec.validate()?;

        let variants = spec
            .variants
            .iter()
            .map(|v| {
                Ok(Variant {
                    name: v.name.clone(),
                    request: encode_request(spec, &v.body)?,
                    expect: v.expect.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let weights: Option<Vec<f64>> = spec
            .variants
            .iter()
            .map(|v| v.weight)
            .collect::<Option<Vec<_>>>();
        let picker = VariantPicker::new(variants.len(), weights);

        Ok(Self { variants, picker })
    }

    /// Number of variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether the catalog is empty (never true for a built catalog)
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Variant at the given index
    pub fn variant(&self, idx: usize) -> &Variant {
        &self.variants[idx]
    }

    /// Iterate over variants in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    /// Draw the next variant index per the scenario's selection policy
    pub fn pick<R: Rng>(&self, rng: &mut R) -> usize {
        self.picker.pick(rng)
    }
}

/// Encode one request: status line, headers, Content-Length framing, body
fn encode_request(spec: &ScenarioSpec, body: &str) -> Result<Vec<u8>> {
    let mut head = format!(
        "POST {} HTTP/1.1\r\nHost: {}:{}\r\nConnection: keep-alive\r\n",
        spec.path, spec.host, spec.port
    );
    for (name, value) in &spec.headers {
        if name.eq_ignore_ascii_case("connection")
            || name.eq_ignore_ascii_case("host")
            || name.eq_ignore_ascii_case("content-length")
        {
            continue;
        }
        if name.contains(['\r', '\n']) || value.contains(['\r', '\n']) {
            return Err(Error::catalog(format!(
                "header '{name}' contains CR/LF and cannot be encoded"
            )));
        }
        if !name.is_ascii() || !value.is_ascii() {
            return Err(Error::catalog(format!(
                "header '{name}' contains non-ASCII bytes and cannot be encoded"
            )));
        }
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

    let mut request = head.into_bytes();
    request.extend_from_slice(body.as_bytes());
    Ok(request)
}

/// Variant selection policy: uniform, or weighted by cumulative draw
///
/// Weighted selection draws uniformly in [0, W) over the total weight W and
/// returns the first variant whose cumulative weight exceeds the draw. If
/// floating-point rounding exhausts the cumulative sums without exceeding the
/// draw, the last variant is selected; that is a defined fallback, not an
/// error.
#[derive(Debug)]
pub struct VariantPicker {
    count: usize,
    cumulative: Option<Vec<f64>>,
}

impl VariantPicker {
    /// Build a picker over `count` variants with optional weights
    pub fn new(count: usize, weights: Option<Vec<f64>>) -> Self {
        let cumulative = weights.map(|ws| {
            let mut acc = 0.0;
            ws.iter()
                .map(|w| {
                    acc += w;
                    acc
                })
                .collect()
        });
        Self { count, cumulative }
    }

    /// Draw a variant index
    pub fn pick<R: Rng>(&self, rng: &mut R) -> usize {
        match &self.cumulative {
            None => rng.gen_range(0..self.count),
            Some(cumulative) => {
                let total = *cumulative.last().unwrap_or(&0.0);
                let draw = rng.gen_range(0.0..total);
                cumulative
                    .iter()
                    .position(|&c| draw < c)
                    .unwrap_or(self.count - 1)
            }
        }
    }
}
