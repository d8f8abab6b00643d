use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Coupon {
    pub id: u32,
    pub name: &'static str,
    pub cost: i64,
    pub description: &'static str,
    pub website: &'static str,
}

pub const COUPONS: &[Coupon] = &[
    Coupon {
        id: 1,
        name: "20% Off Eco-Friendly Products - NYC",
        cost: 100,
        description: "Enjoy 20% off eco-friendly products at EcoStore in New York City.",
        website: "https://ecostore.com",
    },
    Coupon {
        id: 2,
        name: "$10 Off Zero-Waste Items - London",
        cost: 50,
        description: "Save $10 on zero-waste products available at ZeroWaste Shop in London.",
        website: "https://zerowaste.com",
    },
    Coupon {
        id: 3,
        name: "Free Shipping on Sustainable Products - Tokyo",
        cost: 75,
        description: "Get free shipping on orders over $50 at GreenLife in Tokyo.",
        website: "https://greenlife.com",
    },
    Coupon {
        id: 4,
        name: "15% Off Reusable Items - Paris",
        cost: 60,
        description: "Save 15% on all reusable products at ReusableWorld in Paris.",
        website: "https://reusableworld.com",
    },
    Coupon {
        id: 5,
        name: "Buy 1 Get 1 Free Eco Accessories - Sydney",
        cost: 120,
        description: "Enjoy a BOGO offer on selected eco accessories at EcoMart in Sydney.",
        website: "https://ecomart.com",
    },
    Coupon {
        id: 6,
        name: "$5 Off Organic Foods - Toronto",
        cost: 40,
        description: "Get $5 off organic groceries at OrganicMarket in Toronto.",
        website: "https://organicmarket.com",
    },
    Coupon {
        id: 7,
        name: "10% Off Recycled Fashion - Berlin",
        cost: 80,
        description: "Save 10% on sustainable fashion at RecycleStyle in Berlin.",
        website: "https://recyclestyle.com",
    },
    Coupon {
        id: 8,
        name: "Free Eco-Friendly Tote Bag - Singapore",
        cost: 30,
        description: "Receive a free eco-friendly tote bag from GreenCarry in Singapore with your purchase.",
        website: "https://greencarry.com",
    },
    Coupon {
        id: 9,
        name: "25% Off Solar Gadgets - Mumbai",
        cost: 150,
        description: "Enjoy 25% off on solar-powered gadgets at SunTech in Mumbai.",
        website: "https://suntech.com",
    },
    Coupon {
        id: 10,
        name: "Exclusive Access to Green Workshops - Cape Town",
        cost: 200,
        description: "Gain exclusive access to eco-friendly workshops and events at GreenLearn in Cape Town.",
        website: "https://greenlearn.com",
    },
];

pub fn find(id: u32) -> Option<&'static Coupon> {
    COUPONS.iter().find(|coupon| coupon.id == id)
}
