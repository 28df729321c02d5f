//! Replenishment policies and order sizing constraints

use crate::stats::service_level_z;

/// Order-up-to level S for a service-level policy
///
/// `S = z * sigma * sqrt(L + R) + mu * (L + R + 1)`, where `z` is the
/// normal quantile for the target level, `L` the replenishment lead time
/// and `R` the review period in days.
pub fn order_up_to_level(
    service_level: f64,
    mean: f64,
    std_dev: f64,
    lead_time: u32,
    review_period: u32,
) -> f64 {
    let z = service_level_z(service_level);
    let window = (lead_time + review_period) as f64;
    z * std_dev * window.sqrt() + mean * (window + 1.0)
}

/// Order quantity under the service-level policy: raise inventory
/// position up to `target_level`, never below zero, rounded up to whole
/// units
pub fn service_level_order(target_level: f64, inventory_position: f64) -> f64 {
    (target_level - inventory_position).max(0.0).ceil()
}

/// Order quantity under the reorder-point policy used for factory
/// components: order only once position falls to the reorder point, then
/// fill back up to `order_up_to`. Unlike the service-level policy this is
/// not rounded; fractional gaps order fractionally.
pub fn reorder_point_order(reorder_point: f64, order_up_to: f64, inventory_position: f64) -> f64 {
    if inventory_position > reorder_point {
        return 0.0;
    }
    (order_up_to - inventory_position).max(0.0)
}

fn is_positive_integer(value: f64) -> bool {
    value > 0.0 && value.fract() == 0.0
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn round_up_to_multiple(quantity: f64, multiple: f64) -> f64 {
    if multiple <= 0.0 || quantity <= 0.0 {
        return quantity;
    }
    (quantity / multiple).ceil() * multiple
}

/// Combined node- and link-level order sizing rules for one item
///
/// The effective MOQ is the larger of the two. When both multiples are
/// positive integers the effective multiple is their LCM; otherwise the
/// node multiple is applied first and the link multiple second, each as
/// a ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderConstraints {
    pub moq: f64,
    pub node_multiple: f64,
    pub link_multiple: f64,
}

impl OrderConstraints {
    pub fn new(node_moq: f64, link_moq: f64, node_multiple: f64, link_multiple: f64) -> Self {
        Self {
            moq: node_moq.max(link_moq),
            node_multiple,
            link_multiple,
        }
    }

    /// Apply MOQ then multiples to a raw policy quantity
    ///
    /// Zero stays zero: constraints never create an order that the policy
    /// did not ask for.
    pub fn apply(&self, quantity: f64) -> f64 {
        if quantity <= 0.0 {
            return 0.0;
        }
        let mut adjusted = quantity.max(self.moq);

        if is_positive_integer(self.node_multiple) && is_positive_integer(self.link_multiple) {
            let a = self.node_multiple as u64;
            let b = self.link_multiple as u64;
            let lcm = (a / gcd(a, b)) * b;
            adjusted = round_up_to_multiple(adjusted, lcm as f64);
        } else {
            adjusted = round_up_to_multiple(adjusted, self.node_multiple);
            adjusted = round_up_to_multiple(adjusted, self.link_multiple);
        }
        adjusted
    }
}
