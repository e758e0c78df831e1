//! SQLite schema and stock JSON for schema-11 collections.

use serde_json::{Value, json};

/// Newest `col.ver` this module can write.
pub const SCHEMA_VERSION: i64 = 11;

/// SQL to create an empty collection.
///
/// This is Anki's schema-11 table layout, kept as Anki defines it.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS col (
    id              INTEGER PRIMARY KEY,
    crt             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    scm             INTEGER NOT NULL,
    ver             INTEGER NOT NULL,
    dty             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    ls              INTEGER NOT NULL,
    conf            TEXT NOT NULL,
    models          TEXT NOT NULL,
    decks           TEXT NOT NULL,
    dconf           TEXT NOT NULL,
    tags            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notes (
    id              INTEGER PRIMARY KEY,
    guid            TEXT NOT NULL,
    mid             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    tags            TEXT NOT NULL,
    flds            TEXT NOT NULL,
    sfld            INTEGER NOT NULL,
    csum            INTEGER NOT NULL,
    flags           INTEGER NOT NULL,
    data            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id              INTEGER PRIMARY KEY,
    nid             INTEGER NOT NULL,
    did             INTEGER NOT NULL,
    ord             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    type            INTEGER NOT NULL,
    queue           INTEGER NOT NULL,
    due             INTEGER NOT NULL,
    ivl             INTEGER NOT NULL,
    factor          INTEGER NOT NULL,
    reps            INTEGER NOT NULL,
    lapses          INTEGER NOT NULL,
    left            INTEGER NOT NULL,
    odue            INTEGER NOT NULL,
    odid            INTEGER NOT NULL,
    flags           INTEGER NOT NULL,
    data            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS revlog (
    id              INTEGER PRIMARY KEY,
    cid             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    ease            INTEGER NOT NULL,
    ivl             INTEGER NOT NULL,
    lastIvl         INTEGER NOT NULL,
    factor          INTEGER NOT NULL,
    time            INTEGER NOT NULL,
    type            INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS graves (
    usn             INTEGER NOT NULL,
    oid             INTEGER NOT NULL,
    type            INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_notes_usn ON notes (usn);
CREATE INDEX IF NOT EXISTS ix_cards_usn ON cards (usn);
CREATE INDEX IF NOT EXISTS ix_revlog_usn ON revlog (usn);
CREATE INDEX IF NOT EXISTS ix_cards_nid ON cards (nid);
CREATE INDEX IF NOT EXISTS ix_cards_sched ON cards (did, queue, due);
CREATE INDEX IF NOT EXISTS ix_revlog_cid ON revlog (cid);
CREATE INDEX IF NOT EXISTS ix_notes_csum ON notes (csum);
"#;

/// Collection configuration for a new collection, with Anki's defaults.
pub const DEFAULT_CONF: &str = r#"{
    "activeDecks": [1],
    "curDeck": 1,
    "newSpread": 0,
    "collapseTime": 1200,
    "timeLim": 0,
    "estTimes": true,
    "dueCounts": true,
    "curModel": null,
    "nextPos": 1,
    "sortType": "noteFld",
    "sortBackwards": false,
    "addToCur": true
}"#;

/// Deck options group for a new collection, with Anki's defaults.
pub const DEFAULT_DCONF: &str = r#"{
    "1": {
        "id": 1,
        "mod": 0,
        "name": "Default",
        "usn": 0,
        "maxTaken": 60,
        "autoplay": true,
        "timer": 0,
        "replayq": true,
        "new": {
            "bury": true,
            "delays": [1, 10],
            "initialFactor": 2500,
            "ints": [1, 4, 7],
            "order": 1,
            "perDay": 20,
            "separate": true
        },
        "rev": {
            "bury": true,
            "ease4": 1.3,
            "fuzz": 0.05,
            "ivlFct": 1,
            "maxIvl": 36500,
            "perDay": 100,
            "hardFactor": 1.2
        },
        "lapse": {
            "delays": [10],
            "leechAction": 0,
            "leechFails": 8,
            "minInt": 1,
            "mult": 0
        },
        "dyn": false
    }
}"#;

/// Field separator character (ASCII unit separator).
pub const FIELD_SEPARATOR: char = '\x1f';

const DEFAULT_CSS: &str = ".card {\n    font-family: arial;\n    font-size: 20px;\n    text-align: center;\n    color: black;\n    background-color: white;\n}";

const CLOZE_CSS: &str = ".card {\n    font-family: arial;\n    font-size: 20px;\n    text-align: center;\n    color: black;\n    background-color: white;\n}\n\n.cloze {\n    font-weight: bold;\n    color: blue;\n}";

const LATEX_PRE: &str = "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n";

/// JSON for a deck.
pub fn deck_json(id: i64, name: &str, now: i64) -> Value {
    json!({
        "id": id,
        "mod": now,
        "name": name,
        "usn": -1,
        "lrnToday": [0, 0],
        "revToday": [0, 0],
        "newToday": [0, 0],
        "timeToday": [0, 0],
        "collapsed": false,
        "browserCollapsed": false,
        "desc": "",
        "dyn": 0,
        "conf": 1,
        "extendNew": 10,
        "extendRev": 50
    })
}

#[allow(clippy::too_many_arguments)]
fn model_json(
    id: i64,
    name: &str,
    kind: i64,
    fields: &[&str],
    templates: &[(&str, &str, &str)],
    req: Value,
    css: &str,
    now: i64,
) -> Value {
    let flds: Vec<Value> = fields
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "name": name,
                "ord": i,
                "sticky": false,
                "rtl": false,
                "font": "Arial",
                "size": 20,
                "media": []
            })
        })
        .collect();

    let tmpls: Vec<Value> = templates
        .iter()
        .enumerate()
        .map(|(i, (name, qfmt, afmt))| {
            json!({
                "name": name,
                "ord": i,
                "qfmt": qfmt,
                "afmt": afmt,
                "bqfmt": "",
                "bafmt": "",
                "did": null,
                "bfont": "",
                "bsize": 0
            })
        })
        .collect();

    json!({
        "id": id,
        "name": name,
        "type": kind,
        "mod": now,
        "usn": -1,
        "sortf": 0,
        "did": 1,
        "tmpls": tmpls,
        "flds": flds,
        "css": css,
        "latexPre": LATEX_PRE,
        "latexPost": "\\end{document}",
        "latexsvg": false,
        "tags": [],
        "vers": [],
        "req": req
    })
}

/// The note types every new collection starts with, numbered from `first_id`.
pub fn stock_models(first_id: i64, now: i64) -> Vec<Value> {
    vec![
        model_json(
            first_id,
            "Basic",
            0,
            &["Front", "Back"],
            &[(
                "Card 1",
                "{{Front}}",
                "{{FrontSide}}\n\n<hr id=answer>\n\n{{Back}}",
            )],
            json!([[0, "any", [0]]]),
            DEFAULT_CSS,
            now,
        ),
        model_json(
            first_id + 1,
            "Basic (and reversed card)",
            0,
            &["Front", "Back"],
            &[
                (
                    "Card 1",
                    "{{Front}}",
                    "{{FrontSide}}\n\n<hr id=answer>\n\n{{Back}}",
                ),
                (
                    "Card 2",
                    "{{Back}}",
                    "{{FrontSide}}\n\n<hr id=answer>\n\n{{Front}}",
                ),
            ],
            json!([[0, "any", [0]], [1, "any", [1]]]),
            DEFAULT_CSS,
            now,
        ),
        model_json(
            first_id + 2,
            "Cloze",
            1,
            &["Text", "Back Extra"],
            &[("Cloze", "{{cloze:Text}}", "{{cloze:Text}}<br>\n{{Back Extra}}")],
            json!([]),
            CLOZE_CSS,
            now,
        ),
    ]
}
