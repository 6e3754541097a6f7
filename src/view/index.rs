use maud::{Markup, html};

pub fn render_index_template(title: &str) -> Markup {
    html! {
        (maud::DOCTYPE)
        head {
            meta charset="UTF-8";
            meta name="viewport" content="width=device-width, initial-scale=1.0";
            link rel="stylesheet" type="text/css" href="static/styles.css";
            title { (title) }
        }
        body {
            h1 { (title) }
            div id="fixtures" {
                p { a href="/fixtures" { "Today's fixtures" } }
            }
        }
    }
}
