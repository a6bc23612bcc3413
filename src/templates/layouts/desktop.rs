use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = "
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2937; }
header { display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 1.5rem; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
header ul { display: flex; gap: 1rem; list-style: none; margin: 0; }
.container { max-width: 72rem; margin: 1.5rem auto; padding: 0 1rem; }
.card { border: 1px solid #e5e7eb; border-radius: 0.5rem; padding: 1rem; margin-bottom: 1rem; }
th, td { text-align: left; padding: 0.25rem 0.5rem; border-bottom: 1px solid #f3f4f6; }
";

pub fn desktop_layout(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    h3 { "Mandi Price Watch" }
                    nav {
                        ul {
                            li { a href="/" { "Queue" } }
                            li { a href="/api/analytics" { "Analytics (JSON)" } }
                        }
                    }
                }
                (content)
            }
        }
    }
}
