use jumptouch_core::Environment;

/// Correctness flags derived once the trial has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseChecks {
    /// Not every target was touched before the trial ended.
    pub late_response: bool,
    /// Touched ids form a run increasing by exactly one.
    pub order_response: bool,
    pub too_many_touches: bool,
    pub screen_in_landscape: bool,
    pub success: bool,
}

impl ResponseChecks {
    pub fn evaluate(
        choice_order: &[usize],
        target_count: usize,
        touch_count: usize,
        env: &Environment,
    ) -> Self {
        let all_collected = choice_order.len() == target_count;
        let order_response = choice_order.windows(2).all(|w| w[1] == w[0] + 1);
        let screen_in_landscape = env.is_landscape();
        Self {
            late_response: !all_collected,
            order_response,
            too_many_touches: touch_count > target_count,
            screen_in_landscape,
            success: all_collected
                && order_response
                && touch_count == target_count
                && screen_in_landscape,
        }
    }
}
