//! TUI rendering for the Parkly client.
//!
//! All drawing lives here: the login form, the nearby-spaces search view,
//! the bookings list, the active-booking screen with live tracking, and the
//! vehicles view. Rendering is pure - it reads [`App`] and never mutates it.

use crate::app::{App, LoginField, ViewMode};
use crate::geo;
use crate::models::{Booking, BookingStatus, ParkingSpace};
use ratatui::{prelude::*, widgets::*};

use ratatui::text::Line;

/// Renders one frame of the TUI based on current application state.
pub fn render(f: &mut Frame, app: &App) {
    match app.view_mode {
        ViewMode::Login => {
            render_login_view(f, app);
            return;
        }
        ViewMode::Register => {
            render_register_view(f, app);
            return;
        }
        _ => {}
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_tabs(f, app, chunks[0]);

    match app.view_mode {
        ViewMode::Search => render_search_view(f, app, chunks[1]),
        ViewMode::Bookings => render_bookings_view(f, app, chunks[1]),
        ViewMode::ActiveBooking => render_active_booking_view(f, app, chunks[1]),
        ViewMode::Vehicles => render_vehicles_view(f, app, chunks[1]),
        ViewMode::AddVehicle => render_vehicle_form(f, app, chunks[1]),
        ViewMode::Login | ViewMode::Register => {}
    }

    render_status_bar(f, app, chunks[2]);

    if app.confirm_cancel {
        render_cancel_prompt(f);
    }
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let titles = ["[1] Search", "[2] Bookings", "[3] Vehicles"];
    let selected = match app.view_mode {
        ViewMode::Search => 0,
        ViewMode::Bookings | ViewMode::ActiveBooking => 1,
        _ => 2,
    };

    let spans: Vec<Span> = titles
        .iter()
        .enumerate()
        .flat_map(|(i, title)| {
            let style = if i == selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            vec![Span::styled(*title, style), Span::raw("  ")]
        })
        .collect();

    let user = app
        .user
        .as_ref()
        .map(|u| u.username.as_str())
        .unwrap_or("guest");

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(format!(" Parkly - {} ", user))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(header, area);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.view_mode {
        ViewMode::Search => "j/k select · Enter book · r refresh · x sign out · q quit",
        ViewMode::Bookings => "j/k select · Enter open · r refresh · q quit",
        ViewMode::ActiveBooking => "p parked · c cancel · m maps · o call owner · Esc back",
        ViewMode::Vehicles => "j/k select · a add · d delete · r refresh · q quit",
        ViewMode::AddVehicle => "Tab next field · Enter save · Esc back",
        ViewMode::Login | ViewMode::Register => "",
    };

    let line = if app.status_line.is_empty() {
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(Span::styled(
            app.status_line.as_str(),
            Style::default().fg(Color::Yellow),
        ))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_login_view(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 12, f.size());
    f.render_widget(Clear, area);

    let focus_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let blur_style = Style::default().fg(Color::DarkGray);
    let (user_style, pass_style) = match app.login_focus {
        LoginField::Username => (focus_style, blur_style),
        LoginField::Password => (blur_style, focus_style),
    };

    let masked: String = "*".repeat(app.password_input.len());
    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Username: ", user_style),
            Span::raw(app.username_input.as_str()),
        ]),
        Line::from(vec![
            Span::styled("  Password: ", pass_style),
            Span::raw(masked),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Tab switch field · Enter sign in · Ctrl-N create account",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            format!("  {}", app.status_line),
            Style::default().fg(Color::Yellow),
        )),
    ];

    let form = Paragraph::new(lines).block(
        Block::default()
            .title(" Sign in to Parkly ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(form, area);
}

fn render_register_view(f: &mut Frame, app: &App) {
    let area = centered_rect(56, 16, f.size());
    f.render_widget(Clear, area);

    let form = &app.register_form;
    let masked_pw: String = "*".repeat(form.password.len());
    let masked_confirm: String = "*".repeat(form.password_confirm.len());
    let fields = [
        ("Username", form.username.as_str()),
        ("Email", form.email.as_str()),
        ("First name", form.first_name.as_str()),
        ("Last name", form.last_name.as_str()),
        ("Phone", form.phone_number.as_str()),
        ("Password", masked_pw.as_str()),
        ("Confirm", masked_confirm.as_str()),
    ];

    let mut lines = vec![Line::from("")];
    for (i, (label, value)) in fields.iter().enumerate() {
        let style = if i == form.focus {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<12}", format!("{label}:")), style),
            Span::raw(value.to_string()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Tab next field · Enter create account · Esc back",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        format!("  {}", app.status_line),
        Style::default().fg(Color::Yellow),
    )));

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" Create a Parkly account ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(widget, area);
}

/// Search view: nearby spaces list (40%) + detail pane (60%).
fn render_search_view(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let items: Vec<ListItem> = app
        .spaces
        .iter()
        .enumerate()
        .map(|(i, space)| {
            let style = if i == app.selected_space {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let distance = space
                .distance
                .map(geo::format_distance)
                .unwrap_or_else(|| "-".to_string());
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {:<24}", truncate(&space.title, 24)), style),
                Span::styled(
                    format!(" │ {:>8} │ ₹{:.0}/day", distance, space.price_per_day),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Parking Nearby ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(list, chunks[0]);

    if let Some(space) = app.spaces.get(app.selected_space) {
        render_space_detail(f, space, chunks[1]);
    } else {
        let empty = Paragraph::new("No spaces found. Press 'r' to search again.").block(
            Block::default().title(" Details ").borders(Borders::ALL),
        );
        f.render_widget(empty, chunks[1]);
    }
}

fn render_space_detail(f: &mut Frame, space: &ParkingSpace, area: Rect) {
    let amenities = [
        (space.has_security_camera, "camera"),
        (space.has_lighting, "lighting"),
        (space.has_ev_charging, "EV charging"),
        (space.has_24_7_access, "24/7 access"),
    ]
    .iter()
    .filter(|(has, _)| *has)
    .map(|(_, name)| *name)
    .collect::<Vec<_>>()
    .join(", ");

    let lines = vec![
        Line::from(Span::styled(
            format!(" {}", space.title),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(" {} - {}, {}", space.address, space.area, space.city)),
        Line::from(format!(" Type: {:?}  Rating: {:.1}", space.space_type, space.rating)),
        Line::from(format!(
            " Available: {}/{} spaces",
            space.available_spaces, space.total_spaces
        )),
        Line::from(format!(
            " ₹{:.0}/day · ₹{:.0}/month",
            space.price_per_day, space.price_per_month
        )),
        Line::from(format!(
            " Amenities: {}",
            if amenities.is_empty() { "none listed" } else { amenities.as_str() }
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Owner",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            " {} {} ({:.1}★)",
            space.owner.first_name, space.owner.last_name, space.owner.owner_rating
        )),
    ];

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" Details ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(detail, area);
}

fn render_bookings_view(f: &mut Frame, app: &App, area: Rect) {
    let rows: Vec<Row> = app
        .bookings
        .iter()
        .enumerate()
        .map(|(i, booking)| {
            let style = if i == app.selected_booking {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format!("#{}", booking.id)),
                Cell::from(truncate(&booking.parking_space.title, 28).to_string()),
                Cell::from(booking.start_datetime.format("%d %b %H:%M").to_string()),
                Cell::from(booking.end_datetime.format("%d %b %H:%M").to_string()),
                Cell::from(Span::styled(
                    status_label(booking.status),
                    Style::default().fg(status_color(booking.status)),
                )),
                Cell::from(format!("₹{:.0}", booking.total_price)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(7),
        Constraint::Length(30),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Length(10),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["ID", "Space", "From", "To", "Status", "Total"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .title(" My Bookings ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(table, area);
}

/// Active-booking view: status banner, countdown, and live tracking panel.
fn render_active_booking_view(f: &mut Frame, app: &App, area: Rect) {
    let Some(booking) = &app.active_booking else {
        let loading = Paragraph::new("Loading booking...").block(
            Block::default().title(" Booking ").borders(Borders::ALL),
        );
        f.render_widget(loading, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Min(0),
        ])
        .split(area);

    // Status banner
    let banner = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!(" {} ", status_label(booking.status)),
                Style::default()
                    .fg(Color::Black)
                    .bg(status_color(booking.status))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::raw(booking.status.message()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Time remaining: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(app.time_remaining.as_str(), Style::default().fg(Color::Yellow)),
        ]),
    ])
    .block(
        Block::default()
            .title(format!(" Booking #{} ", booking.id))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(banner, chunks[0]);

    // Live tracking
    let tracking_lines = match &app.snapshot {
        Some(snap) => vec![
            Line::from(vec![
                Span::styled("  POSITION: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!("{:.4}, {:.4}", snap.latitude, snap.longitude)),
            ]),
            Line::from(vec![
                Span::styled("  REMAINING: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    geo::format_distance(snap.distance_remaining_km),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw("  │  "),
                Span::styled("ETA: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("{} min", snap.eta_minutes),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
            Line::from(vec![
                Span::styled("  UPDATED: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(snap.at.format("%H:%M:%S UTC").to_string()),
            ]),
        ],
        None if booking.status == BookingStatus::Active => {
            vec![Line::from("  Waiting for the first location fix...")]
        }
        None => vec![Line::from("  Tracking runs while you are on your way.")],
    };

    let tracking = Paragraph::new(tracking_lines).block(
        Block::default()
            .title(" Live Tracking ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(tracking, chunks[1]);

    render_booking_detail(f, booking, chunks[2]);
}

fn render_booking_detail(f: &mut Frame, booking: &Booking, area: Rect) {
    let space = &booking.parking_space;
    let lines = vec![
        Line::from(format!(" {}", space.title)),
        Line::from(format!(" {} - {}, {}", space.address, space.area, space.city)),
        Line::from(""),
        Line::from(format!(
            " Vehicle: {} ({})",
            booking.vehicle.vehicle_number, booking.vehicle.vehicle_model
        )),
        Line::from(format!(
            " Owner: {} {} · {}",
            space.owner.first_name, space.owner.last_name, space.owner.phone_number
        )),
        Line::from(format!(
            " Total: ₹{:.0} (base ₹{:.0}, discount ₹{:.0})",
            booking.total_price, booking.base_price, booking.discount
        )),
    ];
    let detail = Paragraph::new(lines).block(
        Block::default()
            .title(" Details ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(detail, area);
}

fn render_vehicles_view(f: &mut Frame, app: &App, area: Rect) {
    let rows: Vec<Row> = app
        .vehicles
        .iter()
        .enumerate()
        .map(|(i, vehicle)| {
            let style = if i == app.selected_vehicle {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(vehicle.vehicle_number.clone()),
                Cell::from(vehicle.vehicle_type.clone()),
                Cell::from(vehicle.vehicle_model.clone()),
                Cell::from(vehicle.vehicle_color.clone()),
                Cell::from(if vehicle.is_active { "active" } else { "inactive" }),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Length(18),
        Constraint::Length(10),
        Constraint::Length(10),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Number", "Type", "Model", "Color", "Status"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .title(" My Vehicles ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(table, area);
}

fn render_vehicle_form(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.vehicle_form;
    let fields = [
        ("Number", form.number.as_str()),
        ("Type", form.vehicle_type.as_str()),
        ("Model", form.model.as_str()),
        ("Color", form.color.as_str()),
    ];

    let mut lines = vec![Line::from("")];
    for (i, (label, value)) in fields.iter().enumerate() {
        let style = if i == form.focus {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<8}", format!("{label}:")), style),
            Span::raw(value.to_string()),
        ]));
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" Add Vehicle ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(widget, area);
}

fn render_cancel_prompt(f: &mut Frame) {
    let area = centered_rect(44, 5, f.size());
    f.render_widget(Clear, area);
    let prompt = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Cancel this booking?  y / any other key",
            Style::default().fg(Color::Yellow),
        )),
    ])
    .block(
        Block::default()
            .title(" Cancel Booking ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );
    f.render_widget(prompt, area);
}

fn status_label(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::PendingPayment => "PENDING PAYMENT",
        BookingStatus::Confirmed => "CONFIRMED",
        BookingStatus::Active => "ON THE WAY",
        BookingStatus::Arrived => "ARRIVED",
        BookingStatus::Parked => "PARKED",
        BookingStatus::Completed => "COMPLETED",
        BookingStatus::Cancelled => "CANCELLED",
    }
}

fn status_color(status: BookingStatus) -> Color {
    match status {
        BookingStatus::Confirmed | BookingStatus::Completed => Color::Green,
        BookingStatus::Active | BookingStatus::Arrived => Color::Yellow,
        BookingStatus::Parked => Color::Cyan,
        BookingStatus::Cancelled => Color::Red,
        BookingStatus::PendingPayment => Color::Gray,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + r.width.saturating_sub(width) / 2;
    let y = r.y + r.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(r.width),
        height: height.min(r.height),
    }
}
