//! Hand-picked datasets for quick discovery.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PopularDataset {
    /// CKAN dataset name
    pub id: &'static str,
    pub summary: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PopularCategory {
    pub name: &'static str,
    pub datasets: &'static [PopularDataset],
}

/// Business licence dataset, the usual starting point for address lookups.
pub const BUSINESS_LICENCES: &str = "municipal-licensing-and-standards-business-licences-and-permits";

const fn ds(id: &'static str, summary: &'static str) -> PopularDataset {
    PopularDataset { id, summary }
}

pub const POPULAR_DATASETS: &[PopularCategory] = &[
    PopularCategory {
        name: "Food & Safety",
        datasets: &[
            ds("dinesafe", "Restaurant inspections, health scores, violations"),
            ds("mobile-food-vendors", "Food trucks and street vendors"),
        ],
    },
    PopularCategory {
        name: "Business & Permits",
        datasets: &[
            ds(
                BUSINESS_LICENCES,
                "Business directory with addresses (160,000+ establishments)",
            ),
            ds("building-permits", "Construction and renovation permits"),
            ds("sign-permits", "Sign and billboard permits"),
        ],
    },
    PopularCategory {
        name: "Transportation & Traffic",
        datasets: &[
            ds("traffic-signals", "Traffic light locations and timing"),
            ds("traffic-volumes", "Traffic count data on major roads"),
            ds("ttc-routes-and-schedules", "Public transit routes and stops"),
            ds("cycling-network", "Bike lanes and cycling infrastructure"),
        ],
    },
    PopularCategory {
        name: "City Services & Facilities",
        datasets: &[
            ds("parks-facilities", "Parks, pools, rinks, community centres"),
            ds("library-branch-general-information", "Public library locations"),
            ds("fire-station-locations", "Fire stations and emergency services"),
            ds("polling-locations", "Voting locations for elections"),
        ],
    },
    PopularCategory {
        name: "Finance & Budget",
        datasets: &[
            ds("budget-operating", "City operating budget details"),
            ds("budget-capital", "Capital projects and spending"),
            ds("property-tax-rates", "Tax rates by property type"),
        ],
    },
    PopularCategory {
        name: "Environment & Weather",
        datasets: &[
            ds("rain-gauge-locations-and-precipitation", "Weather and rainfall data"),
            ds("air-quality-health-index", "Air quality measurements"),
            ds("green-bins-collection", "Waste collection schedules"),
        ],
    },
    PopularCategory {
        name: "Housing & Development",
        datasets: &[
            ds("neighbourhood-profiles", "Demographics by neighbourhood"),
            ds("wellbeing-toronto", "Community health and social indicators"),
            ds("zoning-by-law-amendments", "Zoning changes and development"),
        ],
    },
];

/// Look up a curated dataset by id.
pub fn find(id: &str) -> Option<&'static PopularDataset> {
    POPULAR_DATASETS
        .iter()
        .flat_map(|category| category.datasets.iter())
        .find(|dataset| dataset.id == id)
}
