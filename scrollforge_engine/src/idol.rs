// Per-side defense points.
//
// Each side fields five idols, one per board row. Losing all five loses the
// battle. The engine only tracks hit points; what reduces them is content
// layer.

use scrollforge_protocol::types::{IDOL_MAX_HP, SideColor};

/// One idol: a side's point-of-defeat resource at a fixed board position.
#[derive(Clone, Copy, Debug)]
pub struct Idol {
    pub color: SideColor,
    pub position: u8,
    pub hp: i32,
    pub max_hp: i32,
}

impl Idol {
    pub fn new(color: SideColor, position: u8) -> Self {
        Self {
            color,
            position,
            hp: IDOL_MAX_HP,
            max_hp: IDOL_MAX_HP,
        }
    }

    /// Apply damage, clamped so hp never goes negative. Returns the amount
    /// actually absorbed.
    pub fn damage(&mut self, amount: i32) -> i32 {
        let absorbed = amount.min(self.hp).max(0);
        self.hp -= absorbed;
        absorbed
    }

    pub fn is_destroyed(&self) -> bool {
        self.hp == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_clamps_at_zero() {
        let mut idol = Idol::new(SideColor::Black, 0);
        assert_eq!(idol.hp, IDOL_MAX_HP);

        let absorbed = idol.damage(IDOL_MAX_HP + 25);
        assert_eq!(absorbed, IDOL_MAX_HP);
        assert_eq!(idol.hp, 0);
        assert!(idol.is_destroyed());

        // Further damage is absorbed as zero, hp never negative.
        assert_eq!(idol.damage(5), 0);
        assert_eq!(idol.hp, 0);
    }

    #[test]
    fn partial_damage() {
        let mut idol = Idol::new(SideColor::White, 3);
        assert_eq!(idol.damage(4), 4);
        assert_eq!(idol.hp, IDOL_MAX_HP - 4);
        assert!(!idol.is_destroyed());
    }

    #[test]
    fn negative_damage_is_ignored() {
        let mut idol = Idol::new(SideColor::White, 1);
        assert_eq!(idol.damage(-3), 0);
        assert_eq!(idol.hp, IDOL_MAX_HP);
    }
}
