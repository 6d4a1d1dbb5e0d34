//! Compiled-in starter word set used when neither the remote table nor the
//! cached copy yields any entries.

use crate::bank::{Article, WordEntry};

struct BuiltinWord {
    term: &'static str,
    answer: &'static str,
    distractors: [&'static str; 3],
    article: Option<Article>,
}

const BUILTIN_WORDS: &[BuiltinWord] = &[
    BuiltinWord {
        term: "Hund",
        answer: "собака",
        distractors: ["кошка", "птица", "лошадь"],
        article: Some(Article::Der),
    },
    BuiltinWord {
        term: "Katze",
        answer: "кошка",
        distractors: ["собака", "мышь", "корова"],
        article: Some(Article::Die),
    },
    BuiltinWord {
        term: "Haus",
        answer: "дом",
        distractors: ["квартира", "улица", "сад"],
        article: Some(Article::Das),
    },
    BuiltinWord {
        term: "Tisch",
        answer: "стол",
        distractors: ["стул", "шкаф", "диван"],
        article: Some(Article::Der),
    },
    BuiltinWord {
        term: "Tür",
        answer: "дверь",
        distractors: ["окно", "стена", "пол"],
        article: Some(Article::Die),
    },
    BuiltinWord {
        term: "Fenster",
        answer: "окно",
        distractors: ["дверь", "зеркало", "крыша"],
        article: Some(Article::Das),
    },
    BuiltinWord {
        term: "Apfel",
        answer: "яблоко",
        distractors: ["груша", "слива", "вишня"],
        article: Some(Article::Der),
    },
    BuiltinWord {
        term: "Milch",
        answer: "молоко",
        distractors: ["вода", "сок", "чай"],
        article: Some(Article::Die),
    },
    BuiltinWord {
        term: "Brot",
        answer: "хлеб",
        distractors: ["масло", "сыр", "торт"],
        article: Some(Article::Das),
    },
    BuiltinWord {
        term: "Baum",
        answer: "дерево",
        distractors: ["куст", "цветок", "трава"],
        article: Some(Article::Der),
    },
    BuiltinWord {
        term: "Stadt",
        answer: "город",
        distractors: ["деревня", "страна", "площадь"],
        article: Some(Article::Die),
    },
    BuiltinWord {
        term: "Wasser",
        answer: "вода",
        distractors: ["молоко", "огонь", "воздух"],
        article: Some(Article::Das),
    },
    BuiltinWord {
        term: "Freund",
        answer: "друг",
        distractors: ["враг", "сосед", "брат"],
        article: Some(Article::Der),
    },
    BuiltinWord {
        term: "Zeit",
        answer: "время",
        distractors: ["час", "день", "год"],
        article: Some(Article::Die),
    },
    BuiltinWord {
        term: "Buch",
        answer: "книга",
        distractors: ["журнал", "письмо", "тетрадь"],
        article: Some(Article::Das),
    },
    BuiltinWord {
        term: "Schlüssel",
        answer: "ключ",
        distractors: ["замок", "карман", "кошелёк"],
        article: Some(Article::Der),
    },
    BuiltinWord {
        term: "Blume",
        answer: "цветок",
        distractors: ["дерево", "лист", "ветка"],
        article: Some(Article::Die),
    },
    BuiltinWord {
        term: "gehen",
        answer: "идти",
        distractors: ["бежать", "стоять", "сидеть"],
        article: None,
    },
    BuiltinWord {
        term: "sprechen",
        answer: "говорить",
        distractors: ["молчать", "слушать", "читать"],
        article: None,
    },
    BuiltinWord {
        term: "essen",
        answer: "есть",
        distractors: ["пить", "спать", "готовить"],
        article: None,
    },
    BuiltinWord {
        term: "trinken",
        answer: "пить",
        distractors: ["есть", "мыть", "наливать"],
        article: None,
    },
    BuiltinWord {
        term: "lesen",
        answer: "читать",
        distractors: ["писать", "считать", "рисовать"],
        article: None,
    },
    BuiltinWord {
        term: "schreiben",
        answer: "писать",
        distractors: ["читать", "стирать", "печатать"],
        article: None,
    },
    BuiltinWord {
        term: "schlafen",
        answer: "спать",
        distractors: ["просыпаться", "работать", "отдыхать"],
        article: None,
    },
    BuiltinWord {
        term: "arbeiten",
        answer: "работать",
        distractors: ["отдыхать", "играть", "учиться"],
        article: None,
    },
    BuiltinWord {
        term: "lernen",
        answer: "учить",
        distractors: ["забывать", "знать", "помнить"],
        article: None,
    },
    BuiltinWord {
        term: "klein",
        answer: "маленький",
        distractors: ["большой", "высокий", "длинный"],
        article: None,
    },
    BuiltinWord {
        term: "groß",
        answer: "большой",
        distractors: ["маленький", "узкий", "короткий"],
        article: None,
    },
    BuiltinWord {
        term: "schnell",
        answer: "быстрый",
        distractors: ["медленный", "тихий", "ленивый"],
        article: None,
    },
    BuiltinWord {
        term: "gut",
        answer: "хороший",
        distractors: ["плохой", "злой", "грустный"],
        article: None,
    },
];

pub(crate) fn builtin_entries() -> Vec<WordEntry> {
    BUILTIN_WORDS
        .iter()
        .map(|word| WordEntry {
            term: word.term.to_string(),
            correct_answer: word.answer.to_string(),
            distractors: word.distractors.map(str::to_string),
            article: word.article,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_never_empty() {
        let entries = builtin_entries();
        assert!(!entries.is_empty());
    }

    #[test]
    fn builtin_table_has_article_words_for_article_training() {
        let with_article = builtin_entries()
            .into_iter()
            .filter(|entry| entry.article.is_some())
            .count();
        assert!(with_article >= 10);
    }

    #[test]
    fn builtin_terms_are_unique() {
        let entries = builtin_entries();
        let unique: std::collections::BTreeSet<&str> =
            entries.iter().map(|entry| entry.term.as_str()).collect();
        assert_eq!(unique.len(), entries.len());
    }
}
