//! Post-run report: win/loss counts, averages, expectancy, equity stats.

use quantbar_core::decimal::Decimal;
use quantbar_core::domain::position::Position;

pub fn print_summary(closed: &[Position], equity: Decimal, max_equity: Decimal, min_equity: Decimal) {
    let mut nwin: u32 = 0;
    let mut nlos: u32 = 0;
    let mut totwin = Decimal::ZERO;
    let mut totlos = Decimal::ZERO;

    for p in closed {
        if p.value() >= Decimal::ZERO {
            nwin += 1;
            totwin += p.value();
        } else {
            nlos += 1;
            totlos += p.value();
        }
    }

    println!("{nwin} won {nlos} lost");

    if nwin == 0 || nlos == 0 {
        println!("final equity: {equity:.2} max {max_equity:.2} min {min_equity:.2}");
        return;
    }

    let tot_pos = Decimal::from(nwin + nlos);
    let pos_won = Decimal::from(nwin) / tot_pos;
    let pos_los = Decimal::from(nlos) / tot_pos;
    println!("{nwin} won {nlos} lost, win rate {pos_won:.2}");

    let avg_win = totwin / Decimal::from(nwin);
    let avg_los = totlos / Decimal::from(nlos);
    println!("avg win {avg_win:.2} avg loss {avg_los:.2}");
    println!("win/loss ratio {:.2}", avg_win / avg_los.abs());
    println!("expectancy {:.2}", avg_win * pos_won + avg_los * pos_los);
    println!("final equity: {equity:.2} max {max_equity:.2} min {min_equity:.2}");
}
