use crate::catalog::{Reward, PRODUCTS, REWARDS};
use crate::configuration::TelegramConfig;
use crate::database::{RedeemOutcome, User};
use crate::payments::LinkSigner;
use chrono::NaiveDate;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html;

/// Every screen reachable through an inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Home,
    Info,
    Menu,
    Rules,
    MyArea,
    RedeemList,
    Redeem(String),
    Admin,
    AdminStats,
    AdminBroadcastInfo,
}

const REDEEM_PREFIX: &str = "redeem:";

impl Screen {
    pub fn from_callback(data: &str) -> Option<Self> {
        let screen = match data {
            "back_home" => Screen::Home,
            "go_info" => Screen::Info,
            "go_menu" => Screen::Menu,
            "go_regeln" => Screen::Rules,
            "mein_bereich" => Screen::MyArea,
            "punkte_einloesen" => Screen::RedeemList,
            "admin" => Screen::Admin,
            "admin_stats" => Screen::AdminStats,
            "admin_broadcast_info" => Screen::AdminBroadcastInfo,
            other => Screen::Redeem(other.strip_prefix(REDEEM_PREFIX)?.to_string()),
        };
        Some(screen)
    }

    pub fn callback_data(&self) -> String {
        match self {
            Screen::Home => "back_home".to_string(),
            Screen::Info => "go_info".to_string(),
            Screen::Menu => "go_menu".to_string(),
            Screen::Rules => "go_regeln".to_string(),
            Screen::MyArea => "mein_bereich".to_string(),
            Screen::RedeemList => "punkte_einloesen".to_string(),
            Screen::Redeem(id) => format!("{}{}", REDEEM_PREFIX, id),
            Screen::Admin => "admin".to_string(),
            Screen::AdminStats => "admin_stats".to_string(),
            Screen::AdminBroadcastInfo => "admin_broadcast_info".to_string(),
        }
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Screen::Admin | Screen::AdminStats | Screen::AdminBroadcastInfo
        )
    }
}

/// Text plus keyboard, ready to be sent or edited in
#[derive(Debug, Clone)]
pub struct View {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

fn button(text: &str, screen: Screen) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, screen.callback_data())
}

// Broken URLs in config drop the button instead of failing the whole screen
fn url_button(text: &str, url: &str) -> Option<InlineKeyboardButton> {
    reqwest::Url::parse(url)
        .ok()
        .map(|url| InlineKeyboardButton::url(text, url))
}

fn back_to(screen: Screen) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("⬅️ Zurück", screen)]])
}

pub fn home(links: &TelegramConfig) -> View {
    let text = "👑 <b>Willkommen zurück bei ChiaraBadGirlsBot!</b> 👑\n\n\
                💋 <b>Dein persönlicher VIP-Bereich wartet auf dich.</b>\n\
                🔥 Entdecke neue Inhalte, sichere dir Angebote und checke deinen Status.\n\n\
                👇 <b>Wähle im Menü unten:</b>";

    let link_row: Vec<_> = [
        url_button("📲 Mein Kanal", &links.channel_url),
        url_button("💬 Schreib mir", &links.contact_url),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut rows = vec![
        vec![button("ℹ️ Info", Screen::Info), button("📄 Menü", Screen::Menu)],
        vec![button("‼️ Regeln", Screen::Rules)],
    ];
    if !link_row.is_empty() {
        rows.push(link_row);
    }
    rows.push(vec![button("👤 Mein Bereich", Screen::MyArea)]);

    View {
        text: text.to_string(),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

pub fn info() -> View {
    View {
        text: "ℹ️ <b>Info</b>\n\n\
               Hier bekommst du exklusive Inhalte, die es nirgendwo sonst gibt.\n\
               Bezahlt wird sicher über PayPal, dein Zugang wird nach der Zahlung \
               automatisch freigeschaltet.\n\n\
               ⭐ Für jeden Einkauf sammelst du 15 % des Betrags als Punkte."
            .to_string(),
        keyboard: back_to(Screen::Home),
    }
}

pub fn rules() -> View {
    View {
        text: "‼️ <b>Regeln</b>\n\n\
               1️⃣ Respektvoller Umgang.\n\
               2️⃣ Inhalte dürfen nicht weitergegeben werden.\n\
               3️⃣ Keine Rückerstattung nach Freischaltung.\n\
               4️⃣ Bei Problemen schreib mir direkt."
            .to_string(),
        keyboard: back_to(Screen::Home),
    }
}

/// Product list, each button is a signed pay link for this user
pub fn shop(signer: &LinkSigner, public_url: &str, user_id: i64, currency: &str) -> View {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = PRODUCTS
        .iter()
        .filter_map(|product| {
            let label = format!("💎 {} – {}", product.name, product.price(currency));
            url_button(&label, &signer.pay_url(public_url, product.sku, user_id))
                .map(|b| vec![b])
        })
        .collect();
    rows.push(vec![button("⬅️ Zurück", Screen::Home)]);

    View {
        text: "📄 <b>Menü</b>\n\n\
               Wähle dein Produkt, du wirst direkt zu PayPal weitergeleitet.\n\
               Nach der Zahlung bekommst du hier eine Bestätigung."
            .to_string(),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

fn format_date(date: Option<NaiveDate>, fallback: &str) -> String {
    date.map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn my_area(user: Option<&User>, today: NaiveDate) -> View {
    let Some(user) = user else {
        return View {
            text: "❌ Keine Daten gefunden. Bitte starte den Bot mit /start.".to_string(),
            keyboard: back_to(Screen::Home),
        };
    };

    let status = match &user.status {
        Some(status) if user.has_active_status(today) => format!("{} ✅", html::escape(status)),
        Some(status) => format!("{} (abgelaufen)", html::escape(status)),
        None => "Kein".to_string(),
    };
    let end = match (&user.status, user.status_end) {
        (Some(_), None) => "unbegrenzt".to_string(),
        (_, end) => format_date(end, "-"),
    };
    let purchases = if user.purchases.is_empty() {
        "Keine Käufe".to_string()
    } else {
        html::escape(&user.purchases.join(", "))
    };

    let text = format!(
        "📂 <b>Dein Bereich</b>\n\n\
         📌 <b>Status:</b> {}\n\
         📅 <b>Start:</b> {}\n\
         ⏳ <b>Ende:</b> {}\n\
         ⭐ <b>Punkte:</b> {}\n\
         🛒 <b>Gekaufte Produkte:</b> {}",
        status,
        format_date(user.status_start, "-"),
        end,
        user.punkte,
        purchases
    );

    View {
        text,
        keyboard: InlineKeyboardMarkup::new(vec![
            vec![button("🎯 Punkte einlösen", Screen::RedeemList)],
            vec![button("⬅️ Zurück", Screen::Home)],
        ]),
    }
}

pub fn redeem_list(balance: i64) -> View {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = REWARDS
        .iter()
        .map(|reward| {
            vec![button(
                &format!("🎁 {} ({} Punkte)", reward.name, reward.cost),
                Screen::Redeem(reward.id.to_string()),
            )]
        })
        .collect();
    rows.push(vec![button("⬅️ Zurück", Screen::MyArea)]);

    View {
        text: format!(
            "🎯 <b>Punkte einlösen</b>\n\n⭐ Dein Guthaben: <b>{}</b> Punkte\n\nWähle eine Belohnung:",
            balance
        ),
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

pub fn redeem_result(reward: &Reward, outcome: &RedeemOutcome) -> View {
    let text = match outcome {
        RedeemOutcome::Redeemed { remaining } => format!(
            "🎉 <b>{}</b> eingelöst!\n\nIch melde mich bei dir. ⭐ Verbleibende Punkte: <b>{}</b>",
            reward.name, remaining
        ),
        RedeemOutcome::InsufficientPoints { balance } => format!(
            "❌ Nicht genug Punkte für <b>{}</b>.\n\nDu brauchst {} Punkte, hast aber nur {}.",
            reward.name, reward.cost, balance
        ),
    };
    View {
        text,
        keyboard: back_to(Screen::MyArea),
    }
}

pub fn admin() -> View {
    View {
        text: "⚙️ <b>Admin-Menü</b>".to_string(),
        keyboard: InlineKeyboardMarkup::new(vec![
            vec![button("📊 Statistik", Screen::AdminStats)],
            vec![button("📢 Broadcast starten", Screen::AdminBroadcastInfo)],
            vec![button("⬅️ Zurück", Screen::Home)],
        ]),
    }
}

pub fn admin_stats(user_count: usize) -> View {
    View {
        text: format!("📊 <b>Gespeicherte User:</b> {}", user_count),
        keyboard: back_to(Screen::Admin),
    }
}

pub fn broadcast_info() -> View {
    View {
        text: "📢 <b>Broadcast</b>\n\nSende <code>/broadcast Deine Nachricht</code>, \
               um allen gespeicherten Usern eine Nachricht zu schicken."
            .to_string(),
        keyboard: back_to(Screen::Admin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NewUser;
    use teloxide::types::InlineKeyboardButtonKind;

    fn links() -> TelegramConfig {
        TelegramConfig {
            admin_ids: vec![1],
            channel_url: "https://t.me/channel".to_string(),
            contact_url: "not a url".to_string(),
            bot_username: "ChiaraBadGirlsBot".to_string(),
            broadcast_concurrency: 4,
        }
    }

    fn callbacks(view: &View) -> Vec<String> {
        view.keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_callback_table() {
        assert_eq!(Screen::from_callback("mein_bereich"), Some(Screen::MyArea));
        assert_eq!(
            Screen::from_callback("redeem:bonus_bild"),
            Some(Screen::Redeem("bonus_bild".to_string()))
        );
        assert_eq!(Screen::from_callback("something_else"), None);
        assert!(Screen::AdminStats.is_admin_only());
        assert!(!Screen::RedeemList.is_admin_only());
    }

    #[test]
    fn test_every_button_leads_somewhere() {
        let signer = LinkSigner::new("s3cret").unwrap();
        let views = [
            home(&links()),
            info(),
            rules(),
            shop(&signer, "https://shop.example.com", 7, "EUR"),
            my_area(None, NaiveDate::default()),
            redeem_list(0),
            admin(),
            admin_stats(3),
            broadcast_info(),
        ];
        for view in &views {
            for data in callbacks(view) {
                assert!(Screen::from_callback(&data).is_some(), "{data}");
            }
        }
    }

    #[test]
    fn test_home_skips_invalid_links() {
        let view = home(&links());
        let urls = view
            .keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter(|b| matches!(b.kind, InlineKeyboardButtonKind::Url(_)))
            .count();
        assert_eq!(urls, 1);
    }

    #[test]
    fn test_shop_has_signed_link_per_product() {
        let signer = LinkSigner::new("s3cret").unwrap();
        let view = shop(&signer, "https://shop.example.com", 7, "EUR");
        let urls: Vec<String> = view
            .keyboard
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::Url(url) => Some(url.to_string()),
                _ => None,
            })
            .collect();

        assert_eq!(urls.len(), PRODUCTS.len());
        assert!(urls[0].starts_with("https://shop.example.com/pay/VIP_PASS?uid=7&sig="));
    }

    #[test]
    fn test_my_area_shows_expiry_and_points() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut user = User::from(NewUser {
            id: 7,
            username: None,
            first_name: None,
            last_name: None,
            language_code: None,
        });
        user.status = Some("LIFETIME".to_string());
        user.status_start = Some(today);
        user.punkte = 22;
        user.purchases = vec!["Lifetime Zugang".to_string()];

        let view = my_area(Some(&user), today);
        assert!(view.text.contains("LIFETIME ✅"));
        assert!(view.text.contains("unbegrenzt"));
        assert!(view.text.contains("18.10.2026"));
        assert!(view.text.contains("<b>Punkte:</b> 22"));
    }
}
