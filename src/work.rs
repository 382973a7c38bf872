//! Static, ordered work lists. Each item identifies one unit of external
//! work; the ingest cursor is an offset into these lists, so their order is
//! part of the persisted contract and must stay stable between runs.

/// One external-fetch task drawn from a static list.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkItem {
    City {
        name: String,
        latitude: f64,
        longitude: f64,
    },
    Title {
        title: String,
    },
    Country {
        name: String,
    },
    CategoryPage {
        category: String,
        page: u32,
    },
}

impl WorkItem {
    /// Display key used in status lines and reports.
    pub fn key(&self) -> String {
        match self {
            WorkItem::City { name, .. } => name.clone(),
            WorkItem::Title { title } => title.clone(),
            WorkItem::Country { name } => name.clone(),
            WorkItem::CategoryPage { category, page } => format!("{category}/p{page}"),
        }
    }
}

pub fn weather_cities() -> Vec<WorkItem> {
    [
        ("Berlin", 52.52, 13.41),
        ("New York", 40.71, -74.01),
        ("Tokyo", 35.68, 139.69),
        ("Sydney", -33.87, 151.21),
        ("São Paulo", -23.55, -46.63),
        ("London", 51.51, -0.13),
        ("Paris", 48.86, 2.35),
        ("Moscow", 55.75, 37.62),
        ("Delhi", 28.66, 77.23),
        ("Los Angeles", 34.05, -118.25),
    ]
    .into_iter()
    .map(|(name, latitude, longitude)| WorkItem::City {
        name: name.to_string(),
        latitude,
        longitude,
    })
    .collect()
}

pub fn movie_titles() -> Vec<WorkItem> {
    [
        "The Shawshank Redemption",
        "The Godfather",
        "The Dark Knight",
        "Pulp Fiction",
        "Forrest Gump",
        "Inception",
        "The Matrix",
        "Fight Club",
        "The Lord of the Rings: The Fellowship of the Ring",
        "The Empire Strikes Back",
        "The Lord of the Rings: The Return of the King",
        "Interstellar",
        "The Green Mile",
        "Gladiator",
        "The Lion King",
        "The Prestige",
        "Saving Private Ryan",
        "The Silence of the Lambs",
        "Schindler's List",
        "Se7en",
        "The Departed",
        "Django Unchained",
        "The Wolf of Wall Street",
        "Whiplash",
        "Avengers: Endgame",
        "Avengers: Infinity War",
        "Iron Man",
        "Spider-Man: No Way Home",
        "Black Panther",
        "Doctor Strange",
        "Guardians of the Galaxy",
        "Captain America: Civil War",
        "Captain Marvel",
        "Thor: Ragnarok",
        "Ant-Man",
        "Deadpool",
        "The Batman",
        "Joker",
        "Logan",
        "The Hunger Games",
        "Harry Potter and the Sorcerer's Stone",
        "Harry Potter and the Prisoner of Azkaban",
        "Harry Potter and the Deathly Hallows: Part 2",
        "Fantastic Beasts and Where to Find Them",
        "Frozen",
        "Frozen II",
        "Toy Story",
        "Toy Story 3",
        "Coco",
        "Inside Out",
        "Up",
        "Finding Nemo",
        "Monsters, Inc.",
        "Shrek",
        "Shrek 2",
        "How to Train Your Dragon",
        "Kung Fu Panda",
        "Despicable Me",
        "Zootopia",
        "Moana",
        "Encanto",
        "Turning Red",
        "The Incredibles",
        "Ratatouille",
        "Cars",
        "Wall-E",
        "Soul",
        "Brave",
        "Luca",
        "Tangled",
        "Big Hero 6",
        "Wreck-It Ralph",
        "Frozen Fever",
        "Maleficent",
        "Aladdin",
        "Beauty and the Beast",
        "The Little Mermaid",
        "Cinderella",
        "Mulan",
        "Pocahontas",
        "Hercules",
        "Tarzan",
        "The Hunchback of Notre Dame",
        "Pirates of the Caribbean: The Curse of the Black Pearl",
        "Pirates of the Caribbean: Dead Man's Chest",
        "National Treasure",
        "The Chronicles of Narnia: The Lion, the Witch and the Wardrobe",
        "The Maze Runner",
        "Divergent",
        "Twilight",
        "Eclipse",
        "Breaking Dawn - Part 2",
        "The Fault in Our Stars",
        "The Notebook",
        "La La Land",
        "A Star is Born",
        "Bohemian Rhapsody",
        "Rocketman",
        "Elvis",
        "The Greatest Showman",
        "Les Misérables",
        "Hamilton",
        "West Side Story",
    ]
    .into_iter()
    .map(|title| WorkItem::Title {
        title: title.to_string(),
    })
    .collect()
}

pub fn country_names() -> Vec<WorkItem> {
    [
        "Germany",
        "United States",
        "Japan",
        "Australia",
        "Brazil",
        "United Kingdom",
        "France",
        "Russia",
        "India",
        "Canada",
        "Mexico",
        "Italy",
        "Spain",
        "Portugal",
        "Netherlands",
        "Belgium",
        "Sweden",
        "Norway",
        "Denmark",
        "Finland",
        "Poland",
        "Austria",
        "Switzerland",
        "Greece",
        "Turkey",
        "Egypt",
        "South Africa",
        "Nigeria",
        "Kenya",
        "China",
        "South Korea",
        "Thailand",
        "Vietnam",
        "Indonesia",
        "Argentina",
        "Chile",
        "Peru",
        "Colombia",
        "New Zealand",
        "Ireland",
    ]
    .into_iter()
    .map(|name| WorkItem::Country {
        name: name.to_string(),
    })
    .collect()
}

pub fn food_category_pages() -> Vec<WorkItem> {
    let categories = ["cereals", "granola-bars", "juices"];
    let mut items = Vec::with_capacity(categories.len() * 5);
    for category in categories {
        for page in 1..=5u32 {
            items.push(WorkItem::CategoryPage {
                category: category.to_string(),
                page,
            });
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_are_stable_and_sized() {
        assert_eq!(weather_cities().len(), 10);
        assert_eq!(movie_titles().len(), 100);
        assert_eq!(food_category_pages().len(), 15);
        // Order is part of the cursor contract.
        assert_eq!(weather_cities()[0].key(), "Berlin");
        assert_eq!(weather_cities()[9].key(), "Los Angeles");
        assert_eq!(food_category_pages()[5].key(), "granola-bars/p1");
    }
}
