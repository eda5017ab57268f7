//! Curated vocabularies for dimension generation.
//!
//! All product taxonomy, geography, and marketplace word pools live here
//! so that generation is fully deterministic (same RNG stream = same
//! names). The taxonomy fixes category L1 -> L2 -> brand pool -> price
//! band, which keeps cost and list price internally consistent.

use crate::rng::StreamRng;

/// Bounded markup range applied when deriving unit cost from list price.
/// cost = list_price / markup, so gross margin is always positive.
pub const MARKUP_RANGE: (f64, f64) = (1.18, 1.75);

/// Categories that attract an extra promotional discount band.
pub const PROMO_CATEGORIES: &[&str] = &["APPAREL", "BEAUTY"];

/// Category whose returns skew toward sizing problems.
pub const APPAREL_L1: &str = "APPAREL";

pub const ACQUISITION_CHANNELS: &[&str] =
    &["ORGANIC", "PAID_SEARCH", "AFFILIATES", "EMAIL", "SOCIAL"];

pub const PAYMENT_PROVIDERS: &[&str] = &["VISA", "MASTERCARD", "PAYPAL", "STRIPE", "RAZORPAY"];

pub const CARRIERS: &[&str] = &["DHL", "FEDEX", "UPS", "LOCAL_XPRESS"];

pub struct CategorySpec {
    pub l1: &'static str,
    pub l2: &'static str,
    pub price_band: (f64, f64),
    pub brands: &'static [&'static str],
    pub nouns: &'static [&'static str],
}

pub const CATALOG: &[CategorySpec] = &[
    CategorySpec {
        l1: "ELECTRONICS",
        l2: "MOBILE",
        price_band: (8_999.0, 89_999.0),
        brands: &["Samsung", "Apple", "Xiaomi", "OnePlus", "Motorola", "Realme"],
        nouns: &["64GB", "128GB", "256GB"],
    },
    CategorySpec {
        l1: "ELECTRONICS",
        l2: "LAPTOP",
        price_band: (29_999.0, 179_999.0),
        brands: &["Dell", "HP", "Lenovo", "ASUS", "Acer", "Apple"],
        nouns: &["i5", "i7", "Ryzen 5", "Ryzen 7"],
    },
    CategorySpec {
        l1: "ELECTRONICS",
        l2: "AUDIO",
        price_band: (999.0, 29_999.0),
        brands: &["Sony", "JBL", "boAt", "Bose", "Sennheiser"],
        nouns: &["Earbuds", "Headphones", "Speaker", "Soundbar"],
    },
    CategorySpec {
        l1: "ELECTRONICS",
        l2: "TV",
        price_band: (19_999.0, 149_999.0),
        brands: &["Samsung", "LG", "Sony", "TCL", "Mi"],
        nouns: &["43-inch", "50-inch", "55-inch", "65-inch"],
    },
    CategorySpec {
        l1: "ELECTRONICS",
        l2: "ACCESSORIES",
        price_band: (299.0, 9_999.0),
        brands: &["Anker", "Spigen", "boAt", "Portronics", "Mi"],
        nouns: &[
            "Power Bank",
            "USB-C Charger",
            "Wireless Mouse",
            "Keyboard",
            "Smartwatch",
            "Fitness Band",
        ],
    },
    CategorySpec {
        l1: "APPLIANCES",
        l2: "KITCHEN",
        price_band: (1_499.0, 49_999.0),
        brands: &["Philips", "Prestige", "Bajaj", "Havells", "Morphy Richards"],
        nouns: &[
            "Air Fryer",
            "Mixer Grinder",
            "Induction Cooktop",
            "Microwave",
            "Coffee Maker",
        ],
    },
    CategorySpec {
        l1: "APPLIANCES",
        l2: "COOLING",
        price_band: (24_999.0, 89_999.0),
        brands: &["LG", "Samsung", "Whirlpool", "Haier", "Panasonic"],
        nouns: &["Refrigerator", "Air Conditioner", "Air Cooler"],
    },
    CategorySpec {
        l1: "APPLIANCES",
        l2: "LAUNDRY",
        price_band: (18_999.0, 69_999.0),
        brands: &["IFB", "LG", "Samsung", "Bosch", "Whirlpool"],
        nouns: &["Washing Machine", "Dryer"],
    },
    CategorySpec {
        l1: "HOME",
        l2: "FURNITURE",
        price_band: (1_999.0, 59_999.0),
        brands: &["IKEA", "Urban Ladder", "Home Centre", "Wakefit"],
        nouns: &["Office Chair", "Study Table", "Sofa", "Bookshelf", "Bed"],
    },
    CategorySpec {
        l1: "HOME",
        l2: "DECOR",
        price_band: (299.0, 12_999.0),
        brands: &["IKEA", "Home Centre", "DecoCraft", "Urban Ladder"],
        nouns: &["Wall Art", "Table Lamp", "Rug", "Curtains", "Clock"],
    },
    CategorySpec {
        l1: "HOME",
        l2: "BED_BATH",
        price_band: (199.0, 7_999.0),
        brands: &["Spaces", "Bombay Dyeing", "D'Decor", "Wakefit"],
        nouns: &["Bedsheet Set", "Pillow", "Comforter", "Towel Set"],
    },
    CategorySpec {
        l1: "APPAREL",
        l2: "MENS",
        price_band: (299.0, 6_999.0),
        brands: &["Levi's", "Allen Solly", "H&M", "U.S. Polo", "Roadster"],
        nouns: &["T-Shirt", "Jeans", "Casual Shirt", "Jacket", "Chinos"],
    },
    CategorySpec {
        l1: "APPAREL",
        l2: "WOMENS",
        price_band: (349.0, 8_999.0),
        brands: &["Zara", "H&M", "Biba", "W", "Vero Moda"],
        nouns: &["Kurta", "Dress", "Top", "Jeans", "Saree"],
    },
    CategorySpec {
        l1: "BEAUTY",
        l2: "SKINCARE",
        price_band: (149.0, 2_499.0),
        brands: &["Nivea", "Neutrogena", "Minimalist", "Mamaearth", "L'Oreal"],
        nouns: &["Face Wash", "Moisturizer", "Sunscreen", "Serum"],
    },
    CategorySpec {
        l1: "BEAUTY",
        l2: "HAIRCARE",
        price_band: (129.0, 1_999.0),
        brands: &["Dove", "Tresemme", "L'Oreal", "Head & Shoulders", "WOW"],
        nouns: &["Shampoo", "Conditioner", "Hair Oil", "Hair Mask"],
    },
    CategorySpec {
        l1: "BEAUTY",
        l2: "MAKEUP",
        price_band: (199.0, 2_999.0),
        brands: &["Lakme", "Maybelline", "Nykaa", "L'Oreal"],
        nouns: &["Lipstick", "Foundation", "Mascara", "Eyeliner"],
    },
    CategorySpec {
        l1: "GROCERY",
        l2: "STAPLES",
        price_band: (99.0, 1_999.0),
        brands: &["Tata", "Aashirvaad", "Fortune", "Saffola", "Patanjali"],
        nouns: &["Basmati Rice", "Atta", "Toor Dal", "Olive Oil", "Ghee"],
    },
    CategorySpec {
        l1: "GROCERY",
        l2: "SNACKS",
        price_band: (10.0, 399.0),
        brands: &["Lay's", "Haldiram's", "Kurkure", "Britannia", "Parle"],
        nouns: &["Chips", "Namkeen", "Biscuits", "Chocolate"],
    },
    CategorySpec {
        l1: "GROCERY",
        l2: "BEVERAGES",
        price_band: (20.0, 999.0),
        brands: &["Nescafe", "Tata Tea", "Bru", "Red Bull", "Paper Boat"],
        nouns: &["Coffee", "Tea", "Energy Drink", "Juice"],
    },
];

pub fn pick_category(rng: &mut StreamRng) -> &'static CategorySpec {
    rng.pick(CATALOG)
}

/// Compose a product name in the house style for the category.
pub fn product_name(rng: &mut StreamRng, spec: &CategorySpec, brand: &str) -> String {
    match (spec.l1, spec.l2) {
        ("ELECTRONICS", "MOBILE") => {
            let series = *rng.pick(&["A", "M", "S", "X"]);
            let model = rng.range_i64(10, 98);
            let storage = *rng.pick(spec.nouns);
            format!("{brand} {series}{model} 5G Smartphone ({storage})")
        }
        ("ELECTRONICS", "LAPTOP") => {
            let line = *rng.pick(&[
                "Inspiron", "Pavilion", "IdeaPad", "VivoBook", "Aspire", "MacBook",
            ]);
            let cpu = *rng.pick(spec.nouns);
            format!("{brand} {line} {cpu} Laptop")
        }
        ("ELECTRONICS", "AUDIO") => {
            let trait_ = *rng.pick(&["Wireless", "Bluetooth", "Noise Cancelling"]);
            let kind = *rng.pick(spec.nouns);
            format!("{brand} {trait_} {kind}")
        }
        ("ELECTRONICS", "TV") => {
            let size = *rng.pick(spec.nouns);
            format!("{brand} {size} 4K Smart TV")
        }
        _ => {
            let noun = *rng.pick(spec.nouns);
            format!("{brand} {noun}")
        }
    }
}

// ── Geography ──────────────────────────────────────────────────────

pub struct CountrySpec {
    pub country: &'static str,
    pub region: &'static str,
    pub currency: &'static str,
}

pub const COUNTRIES: &[CountrySpec] = &[
    CountrySpec { country: "United States", region: "North America", currency: "USD" },
    CountrySpec { country: "Canada", region: "North America", currency: "CAD" },
    CountrySpec { country: "United Kingdom", region: "Europe", currency: "GBP" },
    CountrySpec { country: "Germany", region: "Europe", currency: "EUR" },
    CountrySpec { country: "France", region: "Europe", currency: "EUR" },
    CountrySpec { country: "India", region: "APAC", currency: "INR" },
    CountrySpec { country: "Singapore", region: "APAC", currency: "SGD" },
    CountrySpec { country: "Australia", region: "APAC", currency: "AUD" },
    CountrySpec { country: "Japan", region: "APAC", currency: "JPY" },
    CountrySpec { country: "Brazil", region: "LATAM", currency: "BRL" },
];

pub fn cities_for_region(region: &str) -> &'static [&'static str] {
    match region {
        "North America" => &[
            "New York", "Toronto", "Chicago", "Vancouver", "Austin", "Seattle",
        ],
        "Europe" => &[
            "London", "Berlin", "Paris", "Manchester", "Munich", "Lyon",
        ],
        "APAC" => &[
            "Mumbai", "Bengaluru", "Singapore", "Sydney", "Tokyo", "Delhi",
        ],
        "LATAM" => &["Sao Paulo", "Rio de Janeiro", "Campinas", "Curitiba"],
        _ => &["Springfield"],
    }
}

pub fn timezone_for_region(region: &str) -> &'static str {
    match region {
        "North America" => "America/New_York",
        "Europe" => "Europe/London",
        "APAC" => "Asia/Kolkata",
        "LATAM" => "America/Sao_Paulo",
        _ => "UTC",
    }
}

/// Short uppercase code used in fulfillment center names.
pub fn letter_code(rng: &mut StreamRng, len: usize) -> String {
    (0..len)
        .map(|_| (b'A' + rng.next_u64_below(26) as u8) as char)
        .collect()
}
