// Static skill ontology. Entry order is the tie-break for substring resolution:
// when an unknown skill string matches variants of several entries, the entry
// declared first wins, whichever of its sets matched. An entry that names a
// language in `related` claims free-text mentions of that language from entries
// declared below it.

use super::SkillRelation;

pub static SKILL_ONTOLOGY: &[SkillRelation] = &[
    SkillRelation {
        key: "react",
        exact: &["reactjs", "react.js", "react js"],
        similar: &["preact"],
        related: &["redux", "next.js", "jsx", "javascript", "typescript", "html", "css"],
    },
    SkillRelation {
        key: "react native",
        exact: &["react-native", "reactnative"],
        similar: &[],
        related: &["react", "mobile development", "ios", "android"],
    },
    SkillRelation {
        key: "next.js",
        exact: &["nextjs", "next js"],
        similar: &[],
        related: &["react", "server-side rendering", "vercel"],
    },
    SkillRelation {
        key: "redux",
        exact: &["redux toolkit", "rtk"],
        similar: &[],
        related: &["react", "state management"],
    },
    SkillRelation {
        key: "vue",
        exact: &["vuejs", "vue.js", "vue js"],
        similar: &["nuxt", "nuxt.js"],
        related: &["javascript", "vuex", "pinia"],
    },
    SkillRelation {
        key: "angular",
        exact: &["angularjs", "angular.js"],
        similar: &[],
        related: &["typescript", "rxjs"],
    },
    SkillRelation {
        key: "javascript",
        exact: &["js", "ecmascript", "es6"],
        similar: &["typescript"],
        related: &["html", "css", "frontend", "web development"],
    },
    SkillRelation {
        key: "typescript",
        exact: &["ts"],
        similar: &["javascript"],
        related: &["static typing", "angular"],
    },
    SkillRelation {
        key: "html",
        exact: &["html5"],
        similar: &[],
        related: &["css", "javascript"],
    },
    SkillRelation {
        key: "css",
        exact: &["css3"],
        similar: &["sass", "scss", "less"],
        related: &["html", "tailwind css", "bootstrap"],
    },
    SkillRelation {
        key: "node.js",
        exact: &["node", "nodejs", "node js"],
        similar: &[],
        related: &["express", "javascript", "npm", "rest api"],
    },
    SkillRelation {
        key: "express",
        exact: &["express.js", "expressjs"],
        similar: &["koa"],
        related: &["node.js", "rest api", "middleware"],
    },
    SkillRelation {
        key: "django",
        exact: &["django rest framework", "drf"],
        similar: &[],
        related: &["python", "flask", "rest api"],
    },
    SkillRelation {
        key: "flask",
        exact: &[],
        similar: &[],
        related: &["python", "django", "fastapi"],
    },
    SkillRelation {
        key: "fastapi",
        exact: &["fast api"],
        similar: &[],
        related: &["python", "pydantic", "flask"],
    },
    SkillRelation {
        key: "python",
        exact: &["python3", "py"],
        similar: &[],
        related: &["django", "flask", "fastapi", "pandas", "numpy"],
    },
    SkillRelation {
        key: "spring boot",
        exact: &["spring", "springboot", "spring framework"],
        similar: &[],
        related: &["java", "microservices"],
    },
    SkillRelation {
        key: "java",
        exact: &["java se", "java ee", "jdk"],
        similar: &["kotlin"],
        related: &["spring boot", "jvm", "maven"],
    },
    SkillRelation {
        key: "golang",
        exact: &["go", "go lang"],
        similar: &[],
        related: &["microservices", "docker", "kubernetes"],
    },
    SkillRelation {
        key: "rust",
        exact: &["rust-lang", "rustlang"],
        similar: &[],
        related: &["c++", "systems programming", "webassembly"],
    },
    SkillRelation {
        key: "c++",
        exact: &["cpp", "c plus plus"],
        similar: &["c"],
        related: &["rust", "embedded systems"],
    },
    SkillRelation {
        key: "postgresql",
        exact: &["postgres", "psql"],
        similar: &["sql", "mysql"],
        related: &["database design"],
    },
    SkillRelation {
        key: "mysql",
        exact: &["my sql"],
        similar: &["sql", "postgresql", "mariadb"],
        related: &["database design"],
    },
    SkillRelation {
        key: "sql",
        exact: &["structured query language"],
        similar: &["postgresql", "mysql"],
        related: &["database design", "data analysis"],
    },
    SkillRelation {
        key: "mongodb",
        exact: &["mongo"],
        similar: &[],
        related: &["nosql", "mongoose"],
    },
    SkillRelation {
        key: "docker",
        exact: &["docker compose", "containers"],
        similar: &["podman"],
        related: &["kubernetes", "devops", "ci/cd"],
    },
    SkillRelation {
        key: "kubernetes",
        exact: &["k8s"],
        similar: &["openshift"],
        related: &["docker", "helm", "devops"],
    },
    SkillRelation {
        key: "aws",
        exact: &["amazon web services"],
        similar: &[],
        related: &["cloud computing", "ec2", "s3", "lambda", "devops"],
    },
    SkillRelation {
        key: "ci/cd",
        exact: &["cicd", "continuous integration", "continuous delivery"],
        similar: &[],
        related: &["jenkins", "github actions", "devops", "docker"],
    },
    SkillRelation {
        key: "rest api",
        exact: &["rest", "restful", "restful api"],
        similar: &[],
        related: &["http", "microservices", "express"],
    },
    SkillRelation {
        key: "graphql",
        exact: &[],
        similar: &[],
        related: &["apollo", "rest api"],
    },
    SkillRelation {
        key: "git",
        exact: &[],
        similar: &["github", "gitlab", "bitbucket"],
        related: &["version control", "ci/cd"],
    },
    SkillRelation {
        key: "machine learning",
        exact: &["ml"],
        similar: &["deep learning"],
        related: &["python", "tensorflow", "pytorch", "scikit-learn", "data science"],
    },
    SkillRelation {
        key: "tensorflow",
        exact: &["tf"],
        similar: &["keras"],
        related: &["machine learning", "deep learning", "pytorch"],
    },
    SkillRelation {
        key: "pytorch",
        exact: &["torch"],
        similar: &[],
        related: &["machine learning", "deep learning", "tensorflow"],
    },
    SkillRelation {
        key: "pandas",
        exact: &[],
        similar: &["polars"],
        related: &["python", "numpy", "data analysis"],
    },
    SkillRelation {
        key: "data science",
        exact: &["data scientist"],
        similar: &["data analysis", "data analytics"],
        related: &["python", "statistics", "pandas", "machine learning"],
    },
    SkillRelation {
        key: "agile",
        exact: &["agile methodology"],
        similar: &["scrum", "kanban"],
        related: &["jira", "project management"],
    },
];
