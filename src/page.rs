//! Server-side HTML for the dashboard page.

use crate::binder::DashboardView;
use crate::render::Viewport;
use crate::session::SessionId;
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0 24px; color: #222; }
.app-title { text-align: center; font-size: 28px; font-weight: bold; margin: 20px 0 40px; }
.section-title { font-size: 22px; font-weight: bold; margin: 30px 0 15px; }
.layout { display: flex; gap: 32px; }
.layout > div { flex: 1; }
.cards { display: grid; grid-template-columns: repeat(3, 1fr); gap: 10px; }
.custom-card { background-color: #f9f9f9; border: 1px solid #ddd; border-radius: 5px; padding: 15px;
  text-align: center; font-size: 18px; font-weight: bold; }
.custom-card span { font-size: 28px; font-weight: bold; color: #333; }
label { display: block; margin: 12px 0 4px; }
select { min-width: 240px; font-size: 15px; }
.map-frame { position: relative; display: inline-block; }
#map-tip { position: absolute; display: none; pointer-events: none; background: #fff; border: 1px solid #999;
  border-radius: 3px; padding: 4px 8px; font-size: 13px; white-space: nowrap; }
"#;

// Resolves pointer positions on the map image to venues through the hover API.
const HOVER_SCRIPT: &str = r#"
(function () {
  const map = document.getElementById('map');
  const tip = document.getElementById('map-tip');
  const vp = JSON.parse(map.dataset.viewport);
  const northing = lat => Math.log(Math.tan(Math.PI / 4 + lat * Math.PI / 360));
  const latitude = n => Math.atan(Math.sinh(n)) * 180 / Math.PI;
  let pending = false;
  map.addEventListener('mouseleave', () => { tip.style.display = 'none'; });
  map.addEventListener('mousemove', async ev => {
    if (pending) return;
    pending = true;
    const r = map.getBoundingClientRect();
    const fx = (ev.clientX - r.left) / r.width, fy = (ev.clientY - r.top) / r.height;
    const lon = vp.west + fx * (vp.east - vp.west);
    const top = northing(vp.north), bottom = northing(vp.south);
    const lat = latitude(top - fy * (top - bottom));
    const radius = 8 * (vp.east - vp.west) / r.width;
    try {
      const res = await fetch(`${map.dataset.hover}?lat=${lat}&lon=${lon}&radius=${radius}`);
      const venue = res.ok ? await res.json() : null;
      if (!venue) { tip.style.display = 'none'; return; }
      tip.replaceChildren();
      const name = document.createElement('b');
      name.textContent = venue.category;
      tip.append(name, document.createElement('br'), `province: ${venue.province ?? ''}`,
        document.createElement('br'), `department: ${venue.department ?? ''}`);
      tip.style.left = `${ev.clientX - r.left + 12}px`;
      tip.style.top = `${ev.clientY - r.top + 12}px`;
      tip.style.display = 'block';
    } finally {
      pending = false;
    }
  });
})();
"#;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn select(out: &mut String, name: &str, label: &str, options: &[String], selected: &str) {
    let _ = write!(out, r#"<label for="{name}">{label}</label><select id="{name}" name="{name}" onchange="this.form.submit()">"#);
    for option in options {
        let option = escape(option);
        let mark = if option == escape(selected) { " selected" } else { "" };
        let _ = write!(out, r#"<option value="{option}"{mark}>{option}</option>"#);
    }
    out.push_str("</select>");
}

/// The full dashboard page for one session.
pub fn render_page(
    session: &SessionId,
    renders: u64,
    view: &DashboardView,
    province_options: &[String],
    viewport: &Viewport,
) -> String {
    let base = format!("/session/{session}");
    let mut out = String::with_capacity(8 * 1024);

    let _ = write!(
        out,
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><title>Cultural Spaces and Attendance Rates</title><style>{STYLE}</style></head><body>"#
    );
    out.push_str(r#"<h2 class="app-title">Cultural Spaces and Attendance Rates</h2><div class="layout"><div>"#);

    out.push_str(r#"<h3 class="section-title">Cultural Spaces by Category</h3><div class="cards">"#);
    for card in &view.cards {
        let _ = write!(
            out,
            r#"<div class="custom-card" id="card-{id}"><b>{name}:</b><br><span>{count}</span></div>"#,
            id = escape(&card.category.replace(' ', "_")),
            name = escape(&card.category),
            count = card.count,
        );
    }
    out.push_str("</div>");

    let _ = write!(
        out,
        r#"<h3 class="section-title">School Attendance Rates by Age Group</h3><img id="bar-chart" src="{base}/bar_chart.svg?v={renders}" alt="{alt}">"#,
        alt = escape(view.bar_chart.alt),
    );

    let _ = write!(out, r#"</div><div><h3 class="section-title">Filter Options</h3><form method="get" action="{base}/input">"#);
    select(&mut out, "province", "Select a Province", province_options, view.selection.province().as_str());
    select(&mut out, "department", "Select a Department", &view.department_options, view.selection.department().as_str());
    out.push_str("<noscript><button type=\"submit\">Apply</button></noscript></form>");

    let viewport_json = serde_json::to_string(viewport).unwrap_or_else(|_| "{}".into());
    let _ = write!(
        out,
        r#"<h3 class="section-title">Map of Cultural Spaces by Category</h3><div class="map-frame"><img id="map" src="{base}/map.svg?v={renders}" alt="{alt}" data-viewport="{vp}" data-hover="/api{base}/venue"><div id="map-tip"></div></div>"#,
        alt = escape(view.map.alt),
        vp = escape(&viewport_json),
    );

    let _ = write!(out, "</div></div><script>{HOVER_SCRIPT}</script></body></html>");
    out
}
