//! Key layout. Every record lives under a short prefix so that
//! per-user listings and leaderboards are plain prefix scans.

use super::records::{BoosterKind, UserId};

pub const MONEY_PREFIX: &str = "money:";
pub const SCORE_PREFIX: &str = "score:";
pub const COOLDOWN_PREFIX: &str = "cooldown:";
pub const CARD_PREFIX: &str = "card:";
pub const RARITY_PREFIX: &str = "rarity:";
pub const SHOP_ITEM_PREFIX: &str = "shop:item:";
pub const BUNDLE_PREFIX: &str = "shop:bundle:";
pub const PROMO_PREFIX: &str = "promo:code:";
pub const ADMIN_PREFIX: &str = "admin:";
pub const CASINO_ROUND_PREFIX: &str = "casino:round:";

pub fn money(user: UserId) -> String {
    format!("{}{}", MONEY_PREFIX, user)
}

pub fn score(user: UserId) -> String {
    format!("{}{}", SCORE_PREFIX, user)
}

pub fn cooldown(user: UserId) -> String {
    format!("{}{}", COOLDOWN_PREFIX, user)
}

/// Elixir ids are zero padded so a scan returns them oldest first
pub fn elixir(user: UserId, kind: BoosterKind, id: u64) -> String {
    format!("elixir:{}:{}:{:020}", user, kind, id)
}

pub fn elixir_kind_prefix(user: UserId, kind: BoosterKind) -> String {
    format!("elixir:{}:{}:", user, kind)
}

pub fn elixir_user_prefix(user: UserId) -> String {
    format!("elixir:{}:", user)
}

pub fn luck_armed(user: UserId) -> String {
    format!("luck:armed:{}", user)
}

pub fn premium(user: UserId) -> String {
    format!("premium:{}", user)
}

pub fn bonus(user: UserId) -> String {
    format!("bonus:{}", user)
}

pub fn score_boost(user: UserId) -> String {
    format!("boost:{}", user)
}

pub fn card(user: UserId, filename: &str) -> String {
    format!("{}{}:{}", CARD_PREFIX, user, filename)
}

pub fn card_user_prefix(user: UserId) -> String {
    format!("{}{}:", CARD_PREFIX, user)
}

pub fn favorite(user: UserId) -> String {
    format!("favorite:{}", user)
}

pub fn display_name(user: UserId) -> String {
    format!("name:{}", user)
}

pub fn rarity(filename: &str) -> String {
    format!("{}{}", RARITY_PREFIX, filename)
}

pub fn shop_item(id: u64) -> String {
    format!("{}{:010}", SHOP_ITEM_PREFIX, id)
}

pub fn bundle(id: u64) -> String {
    format!("{}{:010}", BUNDLE_PREFIX, id)
}

pub fn purchase(user: UserId, item_id: u64) -> String {
    format!("purchase:{}:{}", user, item_id)
}

pub fn promo(code: &str) -> String {
    format!("{}{}", PROMO_PREFIX, code.to_lowercase())
}

pub fn promo_use(code: &str, user: UserId) -> String {
    format!("promo:use:{}:{}", code.to_lowercase(), user)
}

pub fn admin(user: UserId) -> String {
    format!("{}{}", ADMIN_PREFIX, user)
}

pub fn casino_round(user: UserId, round_id: &str) -> String {
    format!("{}{}:{}", CASINO_ROUND_PREFIX, user, round_id)
}

pub fn casino_user_prefix(user: UserId) -> String {
    format!("{}{}:", CASINO_ROUND_PREFIX, user)
}

pub fn sequence(name: &str) -> String {
    format!("seq:{}", name)
}

/// User id segment of a `prefix{user}...` key
pub fn user_from_key(key: &str, prefix: &str) -> Option<UserId> {
    key.strip_prefix(prefix)?
        .split(':')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elixir_keys_sort_by_id() {
        let a = elixir(5, BoosterKind::Time, 9);
        let b = elixir(5, BoosterKind::Time, 10);
        assert!(a < b);
        assert!(a.starts_with(&elixir_kind_prefix(5, BoosterKind::Time)));
    }

    #[test]
    fn test_user_from_key() {
        assert_eq!(user_from_key("card:42:hamster.png", CARD_PREFIX), Some(42));
        assert_eq!(user_from_key("money:7", MONEY_PREFIX), Some(7));
        assert_eq!(user_from_key("money:x", MONEY_PREFIX), None);
    }

    #[test]
    fn test_promo_keys_are_case_insensitive() {
        assert_eq!(promo("NewYear"), promo("newyear"));
    }
}
