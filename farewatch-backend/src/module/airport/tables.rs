//! Built-in city and airport tables.
//!
//! Keys are lower-case Russian city names, including the truncated and
//! misspelled variants users tend to type. The first code of every entry is
//! the preferred airport for that city.

pub(super) const CITY_AIRPORTS: &[(&str, &[&str])] = &[
    // Asia
    ("бали", &["DPS"]),
    ("денпасар", &["DPS"]),
    ("бангкок", &["BKK"]),
    ("пхукет", &["HKT"]),
    ("сингапур", &["SIN"]),
    ("куалалумпур", &["KUL"]),
    ("куала-лумпур", &["KUL"]),
    ("ханой", &["HAN"]),
    ("хошимин", &["SGN"]),
    ("дананг", &["DAD"]),
    ("той", &["NRT", "HND"]),
    ("сеул", &["ICN", "GMP"]),
    ("пекин", &["PEK"]),
    ("шахай", &["PVG"]),
    ("шанхай", &["PVG"]),
    ("дел", &["DEL"]),
    ("дуба", &["DXB"]),
    ("дубай", &["DXB"]),
    ("стамбул", &["IST"]),
    // Europe
    ("франкфурт", &["FRA"]),
    ("париж", &["CDG", "ORY"]),
    ("лондон", &["LHR", "LGW", "STN"]),
    ("берлин", &["BER", "SXF", "TXL"]),
    ("амстердам", &["AMS"]),
    ("праж", &["PRG"]),
    ("прага", &["PRG"]),
    ("рим", &["FCO"]),
    ("милан", &["MXP", "LIN"]),
    ("мадрид", &["MAD"]),
    ("барселон", &["BCN"]),
    ("барселона", &["BCN"]),
    ("вена", &["VIE"]),
    ("варшав", &["WAW"]),
    ("варшава", &["WAW"]),
    // Americas
    ("ньюйорк", &["JFK", "LGA", "EWR"]),
    ("нью-йорк", &["JFK", "LGA", "EWR"]),
    ("лосанделес", &["LAX"]),
    ("лос-анделес", &["LAX"]),
    ("маям", &["MIA"]),
    ("майами", &["MIA"]),
    ("чикаг", &["ORD", "MDW"]),
    ("чикаго", &["ORD", "MDW"]),
    ("торонт", &["YYZ"]),
    ("торонто", &["YYZ"]),
    ("вancouver", &["YVR"]),
    ("ванкувер", &["YVR"]),
    // Russia and CIS
    ("москв", &["SVO", "DME", "VKO"]),
    ("москва", &["SVO", "DME", "VKO"]),
    ("санктпетербург", &["LED"]),
    ("петербург", &["LED"]),
    ("екатеринбург", &["SVX"]),
    ("красноярск", &["KJA"]),
    ("иркутск", &["IKT"]),
    ("владивосток", &["VVO"]),
    ("хабаровск", &["KHV"]),
    ("алмат", &["ALA"]),
    ("алматы", &["ALA"]),
    ("ташкент", &["TAS"]),
    ("бишкек", &["FRU"]),
    // Home airports
    ("новосибирск", &["OVB"]),
    ("барнаул", &["BAX"]),
];

pub(super) const AIRPORT_NAMES: &[(&str, &str)] = &[
    // Asia
    ("DPS", "Денпасар (Бали)"),
    ("BKK", "Бангкок"),
    ("HKT", "Пхукет"),
    ("SYD", "Сидней"),
    ("AKL", "Окленд"),
    ("SIN", "Сингапур"),
    ("KUL", "Куала-Лумпур"),
    ("HAN", "Ханой"),
    ("SGN", "Хошимин"),
    ("DAD", "Дананг"),
    ("NRT", "Токио (Наррита)"),
    ("HND", "Токио (Ханеда)"),
    ("ICN", "Сеул"),
    ("GMP", "Сеул (Кимхо)"),
    ("PEK", "Пекин"),
    ("PVG", "Шанхай"),
    ("DEL", "Дели"),
    ("DXB", "Дубай"),
    ("IST", "Стамбул"),
    // Europe
    ("FRA", "Франкфурт"),
    ("CDG", "Париж (Шарль-де-Голль)"),
    ("ORY", "Париж (Орли)"),
    ("LHR", "Лондон (Хитроу)"),
    ("LGW", "Лондон (Гатвик)"),
    ("STN", "Лондон (Станстед)"),
    ("BER", "Берлин"),
    ("SXF", "Берлин (Шёнефельд)"),
    ("TXL", "Берлин (Тегель)"),
    ("AMS", "Амстердам"),
    ("PRG", "Прага"),
    ("FCO", "Рим"),
    ("MXP", "Милан"),
    ("LIN", "Милан (Линате)"),
    ("MAD", "Мадрид"),
    ("BCN", "Барселона"),
    ("VIE", "Вена"),
    ("WAW", "Варшава"),
    // Americas
    ("JFK", "Нью-Йорк (Кеннеди)"),
    ("LGA", "Нью-Йорк (ЛаГуардиа)"),
    ("EWR", "Нью-Йорк (Ньюарк)"),
    ("LAX", "Лос-Анджелес"),
    ("MIA", "Майами"),
    ("ORD", "Чикаго"),
    ("MDW", "Чикаго (Мидуэй)"),
    ("YYZ", "Торонто"),
    ("YVR", "Ванкувер"),
    // Russia and CIS
    ("SVO", "Москва (Шереметьево)"),
    ("DME", "Москва (Домодедово)"),
    ("VKO", "Москва (Внуково)"),
    ("LED", "Санкт-Петербург"),
    ("SVX", "Екатеринбург"),
    ("KJA", "Красноярск"),
    ("IKT", "Иркутск"),
    ("VVO", "Владивосток"),
    ("KHV", "Хабаровск"),
    ("ALA", "Алматы"),
    ("TAS", "Ташкент"),
    ("FRU", "Бишкек"),
    // Home airports
    ("OVB", "Новосибирск"),
    ("BAX", "Барнаул"),
];
