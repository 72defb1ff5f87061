use lexis_core::config::NormalizerConfig;
use lexis_core::tokenizer::{DictionaryLemmatizer, Lemmatizer, StemLemmatizer};
use lexis_core::Normalizer;

fn dictionary_normalizer() -> Normalizer {
    let dictionary = DictionaryLemmatizer::parse("коты кот\nкота кот\nсобаки собака\n");
    Normalizer::new(NormalizerConfig::default(), Box::new(dictionary))
}

#[test]
fn it_cleans_and_filters_tokens() {
    let normalizer = Normalizer::default();
    let tokens = normalizer.tokenize("Кот, и СОБАКА! hello 2024 «мышь» ёж-ёжик на");
    assert_eq!(tokens, vec!["кот", "собака", "мышь", "ёж-ёжик"]);
}

#[test]
fn it_filters_stopwords_and_typos() {
    let config = NormalizerConfig::default()
        .with_stop_words(["собака"])
        .with_typos(["првиет"]);
    let normalizer = Normalizer::new(config, Box::new(DictionaryLemmatizer::default()));
    let tokens = normalizer.tokenize("собака првиет привет это");
    // "это" is only a stop-word in the built-in list, which was replaced
    assert_eq!(tokens, vec!["привет", "это"]);
}

#[test]
fn it_groups_tokens_by_lemma() {
    let doc = dictionary_normalizer().normalize(7, "Коты видели кота и собаки");
    assert_eq!(doc.id, 7);
    assert_eq!(doc.tokens, vec!["коты", "видели", "кота", "собаки"]);
    let kot: Vec<&str> = doc.lemma_groups["кот"].iter().map(String::as_str).collect();
    assert_eq!(kot, vec!["кота", "коты"]);
    assert!(doc.lemma_groups.contains_key("видели"));
    assert_eq!(doc.lemma_groups.len(), 3);
}

#[test]
fn it_stems_word_forms_together() {
    let stemmer = StemLemmatizer::russian();
    assert_eq!(stemmer.lemmatize("собаки"), stemmer.lemmatize("собака"));
    let normalizer = Normalizer::default();
    assert_eq!(normalizer.lemmas("собаки собака").len(), 2);
}

#[test]
fn it_keeps_query_lemma_multiset() {
    let lemmas = dictionary_normalizer().lemmas("коты кота собаки");
    assert_eq!(lemmas, vec!["кот", "кот", "собака"]);
}
