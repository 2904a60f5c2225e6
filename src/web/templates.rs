//! HTML page and fragment rendering for the htmx front end.
//!
//! Pages are assembled with plain formatting; the board fragment doubles as
//! the SSE broadcast payload, so a live page swaps in exactly what a direct
//! response would have returned.

use crate::game::{Coord, Mark};
use crate::session::Session;

const HTMX: &str = r#"<script src="https://unpkg.com/htmx.org@1.9.12"></script>
<script src="https://unpkg.com/htmx.org/dist/ext/sse.js"></script>"#;

fn page(title: &str, content: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"/><title>{title}</title>\n{HTMX}\n</head><body>{content}</body></html>"
    )
}

/// Landing page with the create-game form.
pub fn index_page() -> String {
    page(
        "Crosses",
        "<h1>Crosses</h1><form action=\"/game\" method=\"post\"><button>Create game</button></form>",
    )
}

/// Full game page. Connects to the session's SSE stream and swaps the board
/// fragment in place on each `board` event.
pub fn game_page(session: &Session, board: &str) -> String {
    let content = format!(
        "<div hx-ext=\"sse\" hx-sse=\"connect:/game/{id}/events\">\n\
         <div id=\"board\" hx-sse=\"swap:board\">{board}</div>\n\
         </div>",
        id = session.id,
    );
    page("Crosses", &content)
}

fn cell_symbol(cell: Option<Mark>) -> &'static str {
    match cell {
        Some(Mark::X) => "X",
        Some(Mark::O) => "O",
        None => "",
    }
}

/// The 3x3 board fragment: one single-cell form per square, plus an optional
/// inline message for rejected moves.
pub fn board_fragment(session: &Session, error: Option<&str>) -> String {
    let mut out = String::from("<div id=\"board\">\n");
    if let Some(msg) = error {
        out.push_str(&format!("<div class=\"alert\">{msg}</div>\n"));
    }
    for row in 0..3 {
        out.push_str("<div class=\"row\">");
        for col in 0..3 {
            let cell = session
                .game
                .board()
                .get(Coord::new(row, col))
                .unwrap_or(None);
            out.push_str(&format!(
                "<form hx-post=\"/game/{id}/play\" hx-target=\"#board\" hx-swap=\"outerHTML\" method=\"post\">\
                 <input type=\"hidden\" name=\"r\" value=\"{row}\">\
                 <input type=\"hidden\" name=\"c\" value=\"{col}\">\
                 <button type=\"submit\">{symbol}</button></form>",
                id = session.id,
                symbol = cell_symbol(cell),
            ));
        }
        out.push_str("</div>\n");
    }
    if session.game.over() {
        let verdict = match session.game.winner() {
            Some(mark) => format!("{mark} wins"),
            None => "Draw".to_string(),
        };
        out.push_str(&format!("<div class=\"verdict\">{verdict}</div>\n"));
    }
    out.push_str("</div>");
    out
}
