use maud::{DOCTYPE, Markup, html};

pub fn render_index() -> String {
    page(
        "Home",
        html! {
            section class="fr-card" {
                h1 { "Formrelay" }
                p class="fr-muted" {
                    "Submissions are relayed to the ingest endpoint and stored as JSON."
                }
                a class="fr-btn primary" href="/message" { "Leave a message" }
            }
        },
    )
    .into_string()
}

pub fn render_message_form() -> String {
    page(
        "Message",
        html! {
            section class="fr-card" {
                h1 { "Leave a message" }
                form method="post" action="/message" class="fr-form" {
                    label for="username" { "Name" }
                    input id="username" type="text" name="username" placeholder="Your name" required;
                    label for="message" { "Message" }
                    textarea id="message" name="message" rows="6" placeholder="What would you like to say?" required {}
                    button type="submit" class="fr-btn primary" { "Send" }
                }
            }
        },
    )
    .into_string()
}

fn page(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Formrelay" }
                link rel="stylesheet" href="/style.css";
            }
            body {
                header class="fr-topbar" {
                    img class="fr-logo" src="/logo.png" alt="Formrelay";
                    nav class="fr-nav" {
                        a class="fr-nav-link" href="/" { "Home" }
                        a class="fr-nav-link" href="/message" { "Message" }
                    }
                }
                main class="fr-main" {
                    (body)
                }
            }
        }
    }
}
