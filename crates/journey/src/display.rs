use serde::Serialize;

use agritrace_ledger::StepType;

/// Presentation annotation for one step type: what the timeline renderer
/// shows next to the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDisplay {
    pub label: String,
    pub icon: &'static str,
    /// Hex color used for the step marker.
    pub color: &'static str,
}

/// Map a step type to its timeline annotation.
///
/// Unrecognized step types fall back to a generic marker labelled with their
/// own name, so custom steps render without special-casing.
pub fn step_display(step: &StepType) -> StepDisplay {
    match step {
        StepType::Harvest => StepDisplay {
            label: "Harvested by Farmer".to_string(),
            icon: "🌾",
            color: "#22c55e",
        },
        StepType::Transport => StepDisplay {
            label: "Picked up by Distributor".to_string(),
            icon: "🚛",
            color: "#3b82f6",
        },
        StepType::Retail => StepDisplay {
            label: "Received by Retailer".to_string(),
            icon: "🏪",
            color: "#f59e0b",
        },
        StepType::Sale => StepDisplay {
            label: "Sold to Customer".to_string(),
            icon: "🛒",
            color: "#8b5cf6",
        },
        StepType::Other(name) => StepDisplay {
            label: name.clone(),
            icon: "📍",
            color: "#6b7280",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_steps_have_distinct_colors() {
        let colors: Vec<&str> = [
            StepType::Harvest,
            StepType::Transport,
            StepType::Retail,
            StepType::Sale,
        ]
        .iter()
        .map(|s| step_display(s).color)
        .collect();
        let mut unique = colors.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), colors.len());
    }

    #[test]
    fn unknown_steps_fall_back_to_their_own_name() {
        let display = step_display(&StepType::Other("ColdStorage".to_string()));
        assert_eq!(display.label, "ColdStorage");
        assert_eq!(display.color, "#6b7280");
    }
}
