//! Property tests over the order graph invariants: OCO and trigger
//! round-trips hold for arbitrary sizes and levels.

use proptest::prelude::*;
use quantbar_core::domain::order::{Direction, Order, OrderType};
use rust_decimal::Decimal;

fn arb_size_for(direction: Direction) -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000).prop_map(move |n| {
        let magnitude = Decimal::from(n);
        match direction {
            Direction::Buy => magnitude,
            Direction::Sell => -magnitude,
        }
    })
}

proptest! {
    #[test]
    fn oco_round_trip_holds_for_any_pair(size_a in arb_size_for(Direction::Buy), size_b in arb_size_for(Direction::Sell)) {
        let mut a = Order::new("EURUSD", Direction::Buy, OrderType::Market, None, size_a).unwrap();
        let mut b = Order::new("EURUSD", Direction::Sell, OrderType::Market, None, size_b).unwrap();
        Order::oco(&mut a, &mut b);
        prop_assert!(a.cancels.contains(&b.id));
        prop_assert!(b.cancels.contains(&a.id));
    }

    #[test]
    fn trigger_round_trip_holds_for_any_parent_child(size_p in arb_size_for(Direction::Buy), size_c in arb_size_for(Direction::Sell)) {
        let mut parent = Order::new("EURUSD", Direction::Buy, OrderType::Market, None, size_p).unwrap();
        let mut child = Order::new("EURUSD", Direction::Sell, OrderType::Market, None, size_c).unwrap();
        parent.trigger(&mut child);
        prop_assert_eq!(child.trigger_parent, Some(parent.id));
        prop_assert!(parent.triggers.contains(&child.id));
        prop_assert!(child.triggered());
    }

    #[test]
    fn size_direction_invariant_holds_on_construction(n in 1i64..=1_000_000) {
        let magnitude = Decimal::from(n);
        prop_assert!(Order::new("EURUSD", Direction::Buy, OrderType::Market, None, magnitude).is_ok());
        prop_assert!(Order::new("EURUSD", Direction::Buy, OrderType::Market, None, -magnitude).is_err());
        prop_assert!(Order::new("EURUSD", Direction::Sell, OrderType::Market, None, -magnitude).is_ok());
        prop_assert!(Order::new("EURUSD", Direction::Sell, OrderType::Market, None, magnitude).is_err());
    }
}
