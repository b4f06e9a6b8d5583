//! Device list page
//!
//! One card per known device with its type, name and the newest reading of
//! each compartment. "Detailed data" opens the device view. Cards are shown
//! newest registration first (reverse of server order).

use crate::config::RecentDevice;
use crate::frontend::plot::series_color;
use crate::query::DeviceQuery;
use crate::types::{ChartPoint, Compartment, DeviceSummary};
use egui::{RichText, Ui};

/// What the device list shows for one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCard {
    pub query: DeviceQuery,
    pub top: Option<ChartPoint>,
    pub bottom: Option<ChartPoint>,
}

impl DeviceCard {
    pub fn from_summary(summary: &DeviceSummary) -> Self {
        Self {
            query: DeviceQuery::new(
                summary.meta.mac.clone(),
                summary.meta.device_type.clone(),
                summary.meta.name.clone(),
            ),
            top: summary.last_point(Compartment::Top),
            bottom: summary.last_point(Compartment::Bottom),
        }
    }

    fn latest(&self, compartment: Compartment) -> Option<ChartPoint> {
        match compartment {
            Compartment::Top => self.top,
            Compartment::Bottom => self.bottom,
        }
    }
}

/// Build cards in display order
pub fn build_cards(devices: &[DeviceSummary]) -> Vec<DeviceCard> {
    devices.iter().rev().map(DeviceCard::from_summary).collect()
}

/// Render the list; returns the device the operator chose to open
pub fn render_device_list(
    ui: &mut Ui,
    cards: &[DeviceCard],
    recent: &[RecentDevice],
    loading: bool,
) -> Option<DeviceQuery> {
    let mut chosen = None;

    ui.horizontal(|ui| {
        ui.heading("Devices");
        if loading {
            ui.spinner();
        }
    });

    if !recent.is_empty() {
        ui.horizontal_wrapped(|ui| {
            ui.weak("Recent:");
            for device in recent {
                if ui.small_button(device.display_name()).clicked() {
                    chosen = Some(device.to_query());
                }
            }
        });
    }
    ui.separator();

    if cards.is_empty() && !loading {
        ui.weak("No devices reported by the server.");
        return chosen;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.horizontal_wrapped(|ui| {
            for card in cards {
                if render_card(ui, card) {
                    chosen = Some(card.query.clone());
                }
            }
        });
    });

    chosen
}

fn render_card(ui: &mut Ui, card: &DeviceCard) -> bool {
    let mut open = false;
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(220.0);
        ui.vertical(|ui| {
            ui.label(RichText::new(&card.query.name).strong());
            ui.label(format!("Type: {}", card.query.device_type));
            ui.weak(card.query.mac.as_str());
            ui.add_space(4.0);

            for compartment in Compartment::all() {
                let color = series_color(compartment);
                match card.latest(compartment) {
                    Some(point) => {
                        ui.colored_label(color, format!("{}: {:.1} °C", compartment, point.y));
                        ui.small(point.local_time());
                    }
                    None => {
                        ui.colored_label(color, format!("{}: no data", compartment));
                    }
                }
            }

            ui.add_space(4.0);
            open = ui.button("Detailed data").clicked();
        });
    });
    open
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceMeta, HistoryData, HistoryRecord};

    fn summary(mac: &str, top: &[&str], bottom: &[&str]) -> DeviceSummary {
        HistoryRecord {
            meta: DeviceMeta {
                device_type: "fridge".into(),
                name: format!("fridge {}", mac),
                mac: mac.into(),
            },
            data: HistoryData {
                top: top.iter().map(|s| s.to_string()).collect(),
                bottom: bottom.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn test_card_shows_latest_readings() {
        let card = DeviceCard::from_summary(&summary("AA:11", &["1000:-4.5", "2000:-4.0"], &[]));
        assert_eq!(card.query, DeviceQuery::new("AA:11", "fridge", "fridge AA:11"));
        assert_eq!(card.top, Some(ChartPoint::new(2000, -4.0)));
        assert_eq!(card.bottom, None);
    }

    #[test]
    fn test_cards_reverse_server_order() {
        let cards = build_cards(&[summary("AA:11", &[], &[]), summary("BB:22", &[], &[])]);
        let macs: Vec<_> = cards.iter().map(|c| c.query.mac.to_string()).collect();
        assert_eq!(macs, vec!["BB:22", "AA:11"]);
    }
}
