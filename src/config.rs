//! Folding configuration.

/// Configuration for folding a coclustering report.
///
/// Passed explicitly into [`crate::Folder`]; nothing is read from ambient state.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldConfig {
    /// Tolerance when deciding whether two intervals touch.
    pub epsilon: f64,
    /// Label substituted for the `*` missing-value marker in display bounds.
    pub missing_label: String,
    /// Fail the fold if the total cell frequency is not conserved.
    pub check_mass: bool,
    /// Order the values of a merged value group by descending frequency.
    pub sort_merged_values: bool,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-4,
            missing_label: "Missing".to_string(),
            check_mass: true,
            sort_merged_values: true,
        }
    }
}

impl FoldConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interval adjacency tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the missing-value display label.
    pub fn with_missing_label(mut self, label: impl Into<String>) -> Self {
        self.missing_label = label.into();
        self
    }

    /// Enable or disable the mass conservation check.
    pub fn with_check_mass(mut self, check: bool) -> Self {
        self.check_mass = check;
        self
    }

    /// Enable or disable frequency ordering of merged value groups.
    pub fn with_sort_merged_values(mut self, sort: bool) -> Self {
        self.sort_merged_values = sort;
        self
    }
}
