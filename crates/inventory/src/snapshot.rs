use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockcast_core::{EntityConfig, EntityId};

/// Point-in-time inventory position for one entity.
///
/// `days_of_stock` is `None` when consumption is zero — the position is
/// indefinite coverage, which classifies as normal, never low/out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub entity_id: EntityId,
    pub observed_at: DateTime<Utc>,
    pub current_stock: f64,
    pub avg_daily_consumption: f64,
    pub reorder_point: f64,
    pub days_of_stock: Option<f64>,
}

impl InventorySnapshot {
    pub fn new(
        entity_id: EntityId,
        current_stock: f64,
        avg_daily_consumption: f64,
        reorder_point: f64,
    ) -> Self {
        let days_of_stock = if avg_daily_consumption > 0.0 {
            Some(current_stock / avg_daily_consumption)
        } else {
            None
        };
        Self {
            entity_id,
            observed_at: Utc::now(),
            current_stock,
            avg_daily_consumption,
            reorder_point,
            days_of_stock,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Normal,
    Low,
    Out,
    Overstock,
}

/// Days-of-stock boundaries for classification. Configuration, not
/// constants — they vary per entity/category.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockThresholds {
    pub low_days: f64,
    pub overstock_days: f64,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            low_days: 10.0,
            overstock_days: 90.0,
        }
    }
}

impl From<&EntityConfig> for StockThresholds {
    fn from(cfg: &EntityConfig) -> Self {
        Self {
            low_days: cfg.low_stock_threshold_days,
            overstock_days: cfg.overstock_threshold_days,
        }
    }
}

/// Classify a snapshot. Pure function, no hidden state.
///
/// `Out` takes precedence: zero stock is `Out` regardless of consumption.
pub fn classify(snapshot: &InventorySnapshot, thresholds: &StockThresholds) -> StockStatus {
    if snapshot.current_stock <= 0.0 {
        return StockStatus::Out;
    }
    match snapshot.days_of_stock {
        Some(days) if days < thresholds.low_days => StockStatus::Low,
        Some(days) if days > thresholds.overstock_days => StockStatus::Overstock,
        _ => StockStatus::Normal,
    }
}

/// Replenishment guidance for a classified snapshot.
pub fn suggested_action(status: StockStatus, snapshot: &InventorySnapshot) -> String {
    match status {
        StockStatus::Out => format!(
            "stock is exhausted; expedite a transfer of at least {:.0} units",
            snapshot.reorder_point.max(snapshot.avg_daily_consumption * 7.0)
        ),
        StockStatus::Low => format!(
            "restock to the reorder point ({:.0} units) before coverage runs out",
            snapshot.reorder_point
        ),
        StockStatus::Overstock => {
            "redistribute excess stock or pause replenishment".to_string()
        }
        StockStatus::Normal => "hold; coverage is within configured bounds".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(stock: f64, consumption: f64) -> InventorySnapshot {
        InventorySnapshot::new(EntityId::new(), stock, consumption, 5_000.0)
    }

    #[test]
    fn zero_stock_is_out_regardless_of_consumption() {
        let t = StockThresholds::default();
        assert_eq!(classify(&snapshot(0.0, 520.0), &t), StockStatus::Out);
        assert_eq!(classify(&snapshot(0.0, 0.0), &t), StockStatus::Out);
    }

    #[test]
    fn zero_consumption_is_never_low_or_out_when_stocked() {
        let t = StockThresholds::default();
        let s = snapshot(3.0, 0.0);
        assert_eq!(s.days_of_stock, None);
        assert_eq!(classify(&s, &t), StockStatus::Normal);
    }

    #[test]
    fn seven_days_of_cover_is_low_at_the_default_threshold() {
        let t = StockThresholds::default();
        let s = snapshot(3_200.0, 450.0);
        assert!(s.days_of_stock.unwrap() < 10.0);
        assert_eq!(classify(&s, &t), StockStatus::Low);
    }

    #[test]
    fn one_hundred_forty_days_of_cover_is_overstock() {
        let t = StockThresholds::default();
        let s = snapshot(44_800.0, 320.0);
        assert!((s.days_of_stock.unwrap() - 140.0).abs() < 1e-9);
        assert_eq!(classify(&s, &t), StockStatus::Overstock);
    }

    #[test]
    fn healthy_cover_is_normal() {
        let t = StockThresholds::default();
        assert_eq!(classify(&snapshot(15_200.0, 520.0), &t), StockStatus::Normal);
    }

    #[test]
    fn thresholds_come_from_entity_config() {
        let cfg = EntityConfig::default().with_stock_thresholds(20.0, 60.0);
        let t = StockThresholds::from(&cfg);
        // 15 days of cover: low under the tightened threshold.
        assert_eq!(classify(&snapshot(1_500.0, 100.0), &t), StockStatus::Low);
    }

    proptest! {
        /// Property: classification is total and `Out` is reserved for
        /// zero stock.
        #[test]
        fn out_iff_zero_stock(stock in 0.0f64..100_000.0, consumption in 0.0f64..5_000.0) {
            let status = classify(&snapshot(stock, consumption), &StockThresholds::default());
            if stock == 0.0 {
                prop_assert_eq!(status, StockStatus::Out);
            } else {
                prop_assert_ne!(status, StockStatus::Out);
            }
        }
    }
}
