use maud::{Markup, html};

use crate::model::Fixture;

pub fn render_fixtures_table(fixtures: &[Fixture]) -> Markup {
    html! {
        table class="fixtures" {
            thead {
                tr {
                    th { "Kickoff (UTC)" }
                    th { "Competition" }
                    th { "Status" }
                    th { "Stats" }
                }
            }
            tbody {
                @for fixture in fixtures {
                    tr {
                        td { (fixture.kickoff_ts.format("%H:%M")) }
                        td { (fixture.competition_name) }
                        td { (fixture.status_short) }
                        td {
                            a href=(format!("/fixture?id={}&json=1", fixture.external_id)) {
                                "view"
                            }
                        }
                    }
                }
            }
        }
    }
}
