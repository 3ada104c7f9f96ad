//! Evaluation settings and term mode selectors.
use serde::{Deserialize, Serialize};

/// How the element loop of an evaluator is executed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    #[default]
    Serial,
    /// Elements are partitioned across the rayon thread pool. Every worker owns its scratch
    /// tensors and writes disjoint output rows, so results equal those of serial execution.
    Parallel,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub execution: Execution,
}

impl EvaluationSettings {
    pub fn parallel() -> Self {
        Self {
            execution: Execution::Parallel,
        }
    }
}

/// Whether an integrated quantity is reported as is or divided by the element measure.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegralMode {
    #[default]
    #[serde(rename = "eval")]
    Integral,
    #[serde(rename = "el_avg")]
    ElementAverage,
}

impl IntegralMode {
    /// Maps the integer flag of the term interface: `1` averages, anything else integrates.
    pub fn from_flag(flag: i32) -> Self {
        if flag == 1 {
            Self::ElementAverage
        } else {
            Self::Integral
        }
    }
}

/// Which of the two coupled fields is differentiated.
///
/// In a diffusion coupling `∫ p K·∇q`, one field enters through its gradient and the other
/// through its values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouplingDirection {
    /// The test field is differentiated, the trial (state) field enters by value.
    TestGradient,
    /// The trial (state) field is differentiated, the test field enters by value.
    TrialGradient,
}

impl CouplingDirection {
    /// Maps the integer mode of the term interface: positive modes differentiate the trial field.
    pub fn from_mode(mode: i32) -> Self {
        if mode > 0 {
            Self::TrialGradient
        } else {
            Self::TestGradient
        }
    }
}
