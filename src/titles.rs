//! Display titles for internal entity names.

/// Internal prefab name → in-game display name.
const TITLES: &[(&str, &str)] = &[
    ("BaboonHawkEnemy", "Baboon Hawk"),
    ("Blob", "Hygrodere"),
    ("BushWolfEnemy", "Kidnapper Fox"),
    ("ButlerEnemy", "Butler"),
    ("CaveDwellerEnemy", "Maneater"),
    ("Centipede", "Snare Flea"),
    ("ClaySurgeon", "Barber"),
    ("Crawler", "Thumper"),
    ("DoublewingedBird", "Manticoil"),
    ("FlowerSnakeEnemy", "Tulip Snake"),
    ("Flowerman", "Bracken"),
    ("ForestGiant", "Forest Keeper"),
    ("HoarderBug", "Hoarding Bug"),
    ("JesterEnemy", "Jester"),
    ("LassoMan", "Lasso Man"),
    ("MouthDog", "Eyeless Dog"),
    ("NutcrackerEnemy", "Nutcracker"),
    ("PufferEnemy", "Spore Lizard"),
    ("RadMechEnemy", "Old Bird"),
    ("SandSpider", "Bunker Spider"),
    ("SandWorm", "Earth Leviathan"),
    ("SpringMan", "Coil-Head"),
];

/// Display title for a source id. Unknown ids come back as `!! id !!` so
/// they stand out in reports.
pub fn display_title(id: &str) -> String {
    return TITLES
        .iter()
        .find(|(name, _)| return *name == id)
        .map_or_else(|| return format!("!! {id} !!"), |(_, title)| return (*title).to_string());
}

#[cfg(test)]
mod tests {
    use super::display_title;

    #[test]
    fn known_name() {
        assert_eq!(display_title("Flowerman"), "Bracken");
    }

    #[test]
    fn unknown_name_is_flagged() {
        assert_eq!(display_title("Unlisted"), "!! Unlisted !!");
    }
}
